//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (hardening response headers)
//!     → rate_limit.rs (fixed-window limits per identity)
//!     → csrf.rs (double-submit token, mutating methods)
//!     → sanitize.rs (neutralize HTML-significant characters)
//!     → detector.rs (signature scan, informational)
//!     → Pass to application logic
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed on limits and CSRF; detector only informs
//! - No trust in client input

pub mod csrf;
pub mod detector;
pub mod headers;
pub mod rate_limit;
pub mod sanitize;

pub use csrf::CsrfGuard;
pub use detector::SignatureDetector;
pub use rate_limit::{RateLimiter, RatePolicy};
