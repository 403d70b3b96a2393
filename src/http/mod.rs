//! HTTP server assembly.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer ordering)
//!     → security::headers (hardening, outermost)
//!     → pipeline (admission state machine)
//!     → business handlers / admin API
//! ```

pub mod server;

pub use server::HttpServer;
