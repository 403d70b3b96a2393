//! Metrics collection and exposition.
//!
//! Counter and gauge names:
//! - `gatekeeper_admissions_total` (counter): admissions by outcome
//! - `gatekeeper_rate_limited_total` (counter): denials by policy
//! - `gatekeeper_security_events_total` (counter): events by kind
//! - `gatekeeper_blocked_identities` (gauge): block-list sizes by kind

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// One admission decision, by terminal outcome.
pub fn record_admission(outcome: &'static str) {
    counter!("gatekeeper_admissions_total", "outcome" => outcome).increment(1);
}

/// A rate-limit denial under the given policy.
pub fn record_rate_limited(policy: &'static str) {
    counter!("gatekeeper_rate_limited_total", "policy" => policy).increment(1);
}

/// A security event ingested by the monitor.
pub fn record_security_event(kind: &'static str) {
    counter!("gatekeeper_security_events_total", "kind" => kind).increment(1);
}

/// Current size of a block list ("ip" or "user").
pub fn set_blocked_total(kind: &'static str, count: usize) {
    gauge!("gatekeeper_blocked_identities", "kind" => kind).set(count as f64);
}
