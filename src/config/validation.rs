//! Configuration validation.
//!
//! Semantic checks on top of serde's syntactic parsing. Returns all
//! validation errors, not just the first, so a broken config can be fixed
//! in one pass.

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: &str) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err("listener.bind_address", "not a valid socket address"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(err("listener.request_timeout_secs", "must be greater than zero"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(err("listener.max_body_bytes", "must be greater than zero"));
    }

    for (name, policy) in [
        ("rate_limit.general", &config.rate_limit.general),
        ("rate_limit.auth", &config.rate_limit.auth),
    ] {
        if policy.limit == 0 {
            errors.push(err(name, "limit must be greater than zero"));
        }
        if policy.window_ms == 0 {
            errors.push(err(name, "window_ms must be greater than zero"));
        }
    }

    if config.csrf.enabled {
        if config.csrf.cookie_name.is_empty() {
            errors.push(err("csrf.cookie_name", "must not be empty"));
        }
        if config.csrf.header_name.is_empty() {
            errors.push(err("csrf.header_name", "must not be empty"));
        }
    }

    for (i, pattern) in config.detector.extra_patterns.iter().enumerate() {
        if regex::Regex::new(pattern).is_err() {
            errors.push(err(
                &format!("detector.extra_patterns[{}]", i),
                "not a valid regular expression",
            ));
        }
    }

    if config.store.log_capacity == 0 {
        errors.push(err("store.log_capacity", "must be greater than zero"));
    }
    if config.store.event_capacity == 0 {
        errors.push(err("store.event_capacity", "must be greater than zero"));
    }
    if config.monitor.recent_events == 0 {
        errors.push(err("monitor.recent_events", "must be greater than zero"));
    }
    if config.watchdog.slow_response_ms == 0 {
        errors.push(err("watchdog.slow_response_ms", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(err("observability.metrics_address", "not a valid socket address"));
    }

    if config.admin.api_key.is_empty() {
        errors.push(err("admin.api_key", "must not be empty"));
    }
    if config.admin.root_key.is_empty() {
        errors.push(err("admin.root_key", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
