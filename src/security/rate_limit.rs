//! Fixed-window rate limiting with two policies.
//!
//! General traffic keys on the client IP; authentication traffic keys on
//! the targeted credential combined with the IP, so brute-force protection
//! tracks the victim account as well as the source.

use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::config::schema::{RateLimitConfig, RatePolicyConfig};

/// Which policy an admission check runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePolicy {
    General,
    Auth,
}

/// One identity's counter within the current window.
#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    window_reset_at: Instant,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Time until the window resets, set on denial.
    pub retry_after: Option<Duration>,
    /// The limit and window that applied, for event payloads.
    pub limit: u32,
    pub window_ms: u64,
}

/// Fixed-window rate limiter. Owns its identity→record maps exclusively.
pub struct RateLimiter {
    general: DashMap<String, RateLimitRecord>,
    auth: DashMap<String, RateLimitRecord>,
    config: ArcSwap<RateLimitConfig>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            general: DashMap::new(),
            auth: DashMap::new(),
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Swap in new limits on config reload. Live windows keep their
    /// current counts; the new limits apply from the next check.
    pub fn apply_config(&self, config: RateLimitConfig) {
        self.config.store(std::sync::Arc::new(config));
    }

    fn policy_config(&self, policy: RatePolicy) -> RatePolicyConfig {
        let config = self.config.load();
        match policy {
            RatePolicy::General => config.general,
            RatePolicy::Auth => config.auth,
        }
    }

    fn map(&self, policy: RatePolicy) -> &DashMap<String, RateLimitRecord> {
        match policy {
            RatePolicy::General => &self.general,
            RatePolicy::Auth => &self.auth,
        }
    }

    /// Derive the auth-policy identity: credential + IP when a credential
    /// is present, the IP alone otherwise.
    pub fn auth_identity(credential: Option<&str>, ip: &str) -> String {
        match credential {
            Some(cred) if !cred.is_empty() => format!("{}|{}", cred.to_lowercase(), ip),
            _ => ip.to_string(),
        }
    }

    /// Check and count one request for `identity` under `policy`.
    ///
    /// The read-modify-write is serialized per identity by the map's entry
    /// lock, so concurrent checks cannot both observe `count < limit` for
    /// the same key.
    pub fn admit(&self, identity: &str, policy: RatePolicy) -> RateLimitDecision {
        let policy_config = self.policy_config(policy);
        let window = Duration::from_millis(policy_config.window_ms);
        let now = Instant::now();

        let mut record = self
            .map(policy)
            .entry(identity.to_string())
            .or_insert(RateLimitRecord {
                count: 0,
                window_reset_at: now + window,
            });

        if now > record.window_reset_at {
            record.count = 1;
            record.window_reset_at = now + window;
            return RateLimitDecision {
                allowed: true,
                retry_after: None,
                limit: policy_config.limit,
                window_ms: policy_config.window_ms,
            };
        }

        if record.count >= policy_config.limit {
            return RateLimitDecision {
                allowed: false,
                retry_after: Some(record.window_reset_at.saturating_duration_since(now)),
                limit: policy_config.limit,
                window_ms: policy_config.window_ms,
            };
        }

        record.count += 1;
        RateLimitDecision {
            allowed: true,
            retry_after: None,
            limit: policy_config.limit,
            window_ms: policy_config.window_ms,
        }
    }

    /// Skip-on-success: a request later marked as a successful
    /// authentication does not count toward the auth limit.
    pub fn record_auth_success(&self, identity: &str) {
        if let Some(mut record) = self.auth.get_mut(identity) {
            record.count = record.count.saturating_sub(1);
        }
    }

    /// Drop records whose window has expired. Housekeeping only; admission
    /// correctness never depends on pruning.
    pub fn prune(&self) {
        let now = Instant::now();
        self.general.retain(|_, r| r.window_reset_at > now);
        self.auth.retain(|_, r| r.window_reset_at > now);
    }

    pub fn tracked_identities(&self) -> usize {
        self.general.len() + self.auth.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            general: RatePolicyConfig { limit, window_ms },
            auth: RatePolicyConfig { limit, window_ms },
            auth_paths: vec![],
        })
    }

    #[test]
    fn admits_up_to_limit_then_denies() {
        let limiter = limiter(3, 60_000);
        for _ in 0..3 {
            assert!(limiter.admit("10.0.0.1", RatePolicy::General).allowed);
        }
        let denied = limiter.admit("10.0.0.1", RatePolicy::General);
        assert!(!denied.allowed);
        assert!(denied.retry_after.is_some());
    }

    #[test]
    fn identities_are_independent() {
        let limiter = limiter(1, 60_000);
        assert!(limiter.admit("10.0.0.1", RatePolicy::General).allowed);
        assert!(limiter.admit("10.0.0.2", RatePolicy::General).allowed);
        assert!(!limiter.admit("10.0.0.1", RatePolicy::General).allowed);
    }

    #[test]
    fn policies_are_independent() {
        let limiter = limiter(1, 60_000);
        assert!(limiter.admit("10.0.0.1", RatePolicy::General).allowed);
        assert!(limiter.admit("10.0.0.1", RatePolicy::Auth).allowed);
    }

    #[test]
    fn window_resets_after_elapse() {
        let limiter = limiter(3, 1000);
        // Requests 1-3 admitted, request 4 denied within the window.
        for _ in 0..3 {
            assert!(limiter.admit("10.0.0.1", RatePolicy::General).allowed);
        }
        assert!(!limiter.admit("10.0.0.1", RatePolicy::General).allowed);

        std::thread::sleep(Duration::from_millis(1100));
        assert!(limiter.admit("10.0.0.1", RatePolicy::General).allowed);
    }

    #[test]
    fn auth_success_does_not_consume_attempts() {
        let limiter = limiter(2, 60_000);
        let identity = RateLimiter::auth_identity(Some("User@Example.com"), "10.0.0.1");
        assert_eq!(identity, "user@example.com|10.0.0.1");

        for _ in 0..5 {
            assert!(limiter.admit(&identity, RatePolicy::Auth).allowed);
            limiter.record_auth_success(&identity);
        }
        // Failed attempts still count.
        assert!(limiter.admit(&identity, RatePolicy::Auth).allowed);
        assert!(limiter.admit(&identity, RatePolicy::Auth).allowed);
        assert!(!limiter.admit(&identity, RatePolicy::Auth).allowed);
    }

    #[test]
    fn auth_identity_falls_back_to_ip() {
        assert_eq!(RateLimiter::auth_identity(None, "10.0.0.1"), "10.0.0.1");
        assert_eq!(RateLimiter::auth_identity(Some(""), "10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn prune_drops_expired_records() {
        let limiter = limiter(3, 50);
        limiter.admit("10.0.0.1", RatePolicy::General);
        assert_eq!(limiter.tracked_identities(), 1);
        std::thread::sleep(Duration::from_millis(80));
        limiter.prune();
        assert_eq!(limiter.tracked_identities(), 0);
    }

    #[test]
    fn reload_applies_new_limits() {
        let limiter = limiter(1, 60_000);
        assert!(limiter.admit("10.0.0.1", RatePolicy::General).allowed);
        assert!(!limiter.admit("10.0.0.1", RatePolicy::General).allowed);

        limiter.apply_config(RateLimitConfig {
            general: RatePolicyConfig {
                limit: 5,
                window_ms: 60_000,
            },
            auth: RatePolicyConfig {
                limit: 5,
                window_ms: 60_000,
            },
            auth_paths: vec![],
        });
        assert!(limiter.admit("10.0.0.1", RatePolicy::General).allowed);
    }
}
