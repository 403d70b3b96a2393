//! Lifecycle management subsystem.
//!
//! # Design Decisions
//! - Ordered startup: config first, then services, then the listener
//! - Shutdown via a broadcast channel all long-running tasks subscribe to
//! - In-flight event reporting completes even during shutdown

pub mod shutdown;

pub use shutdown::Shutdown;
