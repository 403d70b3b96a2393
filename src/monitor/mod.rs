//! Security monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages produce:
//!     → event.rs (structured SecurityEvent / LogEntry)
//!     → store.rs (bounded, queryable, exportable sequences)
//!     → engine.rs (block lists, auto-escalation, stats)
//!     → analysis.rs (derived per-identity risk analyses)
//!
//! Consumers:
//!     → Admission pipeline (block list lookups)
//!     → Admin API (stats, activity, analyses, block commands)
//! ```
//!
//! # Design Decisions
//! - Events are immutable once created; newest first
//! - Bounded sequences evict oldest on overflow (FIFO)
//! - Analyses are recomputed per query, never persisted

pub mod analysis;
pub mod engine;
pub mod event;
pub mod store;

pub use engine::SecurityMonitor;
pub use event::{LogEntry, LogLevel, SecurityEvent, SecurityEventKind, Severity};
pub use store::EventStore;
