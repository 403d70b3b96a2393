//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admission gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Rate limiting policies.
    pub rate_limit: RateLimitConfig,

    /// CSRF double-submit protection.
    pub csrf: CsrfConfig,

    /// Attack signature detection.
    pub detector: DetectorConfig,

    /// Security monitor / risk engine settings.
    pub monitor: MonitorConfig,

    /// Event and log store capacities.
    pub store: StoreConfig,

    /// Response-time watchdog.
    pub watchdog: WatchdogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size the pipeline will buffer for inspection.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// A single fixed-window rate limit policy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RatePolicyConfig {
    /// Maximum requests admitted per window.
    pub limit: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Policy for general traffic, keyed on client IP.
    pub general: RatePolicyConfig,

    /// Policy for authentication traffic, keyed on credential + IP.
    pub auth: RatePolicyConfig,

    /// Path prefixes treated as authentication traffic.
    pub auth_paths: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general: RatePolicyConfig {
                limit: 10,
                window_ms: 60_000,
            },
            auth: RatePolicyConfig {
                limit: 5,
                window_ms: 15 * 60_000,
            },
            auth_paths: vec!["/api/login".to_string()],
        }
    }
}

/// CSRF protection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Enable the CSRF guard for mutating methods.
    pub enabled: bool,

    /// Cookie carrying the double-submit token.
    pub cookie_name: String,

    /// Header the client must echo the token in.
    pub header_name: String,

    /// Mark the token cookie Secure (production).
    pub secure_cookies: bool,

    /// Path prefixes exempt from CSRF checks (e.g., webhook receivers).
    pub exempt_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie_name: "csrf_token".to_string(),
            header_name: "x-csrf-token".to_string(),
            secure_cookies: false,
            exempt_paths: vec!["/webhooks/".to_string()],
        }
    }
}

/// Signature detector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Enable signature scanning.
    pub enabled: bool,

    /// Additional regex patterns appended to the built-in set.
    pub extra_patterns: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_patterns: Vec::new(),
        }
    }
}

/// Security monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Enable automatic escalation into the block lists.
    pub auto_block_enabled: bool,

    /// Cumulative risk score over retained events that triggers an
    /// automatic IP block.
    pub auto_block_risk_threshold: u32,

    /// Default limit for the activity and log views.
    pub recent_events: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            auto_block_enabled: true,
            auto_block_risk_threshold: 150,
            recent_events: 50,
        }
    }
}

/// Event/log store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum retained log entries.
    pub log_capacity: usize,

    /// Maximum retained security events.
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_capacity: 1000,
            event_capacity: 1000,
        }
    }
}

/// Response-time watchdog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Responses slower than this are reported as suspicious.
    pub slow_response_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            slow_response_ms: 5000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Address for the metrics endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Operator key: read access plus block/unblock.
    pub api_key: String,

    /// Root key: additionally allows destructive clears.
    pub root_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_key: "admin-secret-key".to_string(),
            root_key: "root-secret-key".to_string(),
        }
    }
}
