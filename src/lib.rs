//! Admission Control & Threat-Detection Pipeline
//!
//! Inspects every inbound request before it reaches business logic and
//! decides whether to rate-limit, reject, sanitize, or flag it.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────────┐
//!                 │                  ADMISSION GATEWAY                     │
//!                 │                                                        │
//!  Request ───────┼─▶ hardening ─▶ block ─▶ rate ─▶ csrf ─▶ sanitize ──▶  │──▶ business
//!                 │    headers     lists    limit   guard                 │    handlers
//!                 │                  │        │       │        │          │
//!                 │                  ▼        ▼       ▼        ▼          │
//!                 │              ┌──────────────────────────────────┐     │
//!                 │              │  security monitor (risk engine)  │◀────┼─ detector,
//!                 │              │  block sets · auto-escalation    │     │  watchdog
//!                 │              └───────────────┬──────────────────┘     │  (async)
//!                 │                              ▼                        │
//!                 │              ┌──────────────────────────────────┐     │
//!                 │              │  event/log store (bounded FIFO)  │◀──▶ │    admin API
//!                 │              └──────────────────────────────────┘     │    + CLI
//!                 └───────────────────────────────────────────────────────┘
//! ```
//!
//! State is in-memory and single-process; horizontal scaling requires an
//! external shared store and is out of scope.

// Core subsystems
pub mod config;
pub mod errors;
pub mod http;
pub mod pipeline;

// Detection and enforcement
pub mod monitor;
pub mod security;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use errors::AdmissionError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
