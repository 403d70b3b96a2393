//! Central risk engine: block lists, auto-escalation, stats and analyses.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;

use crate::config::schema::MonitorConfig;
use crate::errors::AdmissionError;
use crate::monitor::analysis::{analyze_ip, analyze_user, IpAnalysis, UserAnalysis};
use crate::monitor::event::{
    now_ms, EventContext, LogEntry, LogLevel, SecurityEvent, SecurityEventKind, Severity,
};
use crate::monitor::store::{ClearTarget, EventFilter, EventStore, LogFilter};
use crate::observability::metrics;

/// An active block-list entry.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry {
    pub reason: String,
    pub blocked_at_ms: u64,
    pub blocked_by: Option<String>,
}

/// Aggregate counters for dashboard summaries.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStats {
    pub total_events: usize,
    pub blocked_ips: usize,
    pub blocked_users: usize,
    pub suspicious_activities: usize,
    pub detection_rules: usize,
}

/// The security monitor owns both block sets and is their only writer.
pub struct SecurityMonitor {
    store: Arc<EventStore>,
    blocked_ips: DashMap<String, BlockEntry>,
    blocked_users: DashMap<String, BlockEntry>,
    config: ArcSwap<MonitorConfig>,
    detection_rules: std::sync::atomic::AtomicUsize,
}

impl SecurityMonitor {
    pub fn new(store: Arc<EventStore>, config: MonitorConfig) -> Self {
        Self {
            store,
            blocked_ips: DashMap::new(),
            blocked_users: DashMap::new(),
            config: ArcSwap::from_pointee(config),
            detection_rules: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Swap in new thresholds on config reload.
    pub fn apply_config(&self, config: MonitorConfig) {
        self.config.store(Arc::new(config));
    }

    /// Record how many detection rules are active, for stats.
    pub fn set_detection_rules(&self, count: usize) {
        self.detection_rules
            .store(count, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Ingest an event: append to the store, then evaluate auto-escalation.
    pub fn report_event(&self, event: SecurityEvent) {
        metrics::record_security_event(event.kind.label());
        if event.severity >= Severity::High {
            tracing::warn!(
                kind = event.kind.label(),
                ip = %event.context.ip,
                severity = ?event.severity,
                risk = event.risk_score,
                "Security event"
            );
        }

        let is_audit = matches!(event.kind, SecurityEventKind::AdminAction { .. });
        let severity = event.severity;
        let ip = event.context.ip.clone();
        self.store.push_event(event);

        if is_audit || ip.is_empty() {
            return;
        }
        let config = self.config.load();
        if !config.auto_block_enabled || self.is_ip_blocked(&ip) {
            return;
        }

        if severity == Severity::Critical {
            self.auto_block(&ip, "auto-blocked: critical severity event");
            return;
        }

        let history = self.store.query_events(&EventFilter {
            ip: Some(ip.clone()),
            ..EventFilter::default()
        });
        let cumulative: u32 = history.iter().map(|e| e.risk_score as u32).sum();
        if cumulative >= config.auto_block_risk_threshold {
            self.auto_block(
                &ip,
                &format!("auto-blocked: cumulative risk {} over threshold", cumulative),
            );
        }
    }

    fn auto_block(&self, ip: &str, reason: &str) {
        tracing::warn!(ip = %ip, reason, "Auto-escalating IP into block list");
        self.insert_block(ip, reason, None, true);
    }

    fn insert_block(&self, ip: &str, reason: &str, actor: Option<String>, is_ip: bool) -> bool {
        let set = if is_ip { &self.blocked_ips } else { &self.blocked_users };
        let changed = if set.contains_key(ip) {
            false
        } else {
            set.insert(
                ip.to_string(),
                BlockEntry {
                    reason: reason.to_string(),
                    blocked_at_ms: now_ms(),
                    blocked_by: actor.clone(),
                },
            );
            true
        };

        let kind_label = if is_ip { "ip" } else { "user" };
        metrics::set_blocked_total(kind_label, set.len());

        let audit = SecurityEvent::new(
            SecurityEventKind::AdminAction {
                action: format!("block-{}", kind_label),
                target: ip.to_string(),
            },
            EventContext {
                ip: if is_ip { ip.to_string() } else { String::new() },
                user_id: if is_ip { None } else { Some(ip.to_string()) },
                ..EventContext::default()
            },
        );
        self.report_event(audit.with_severity(Severity::High));
        self.store.push_log(
            LogEntry::new(
                LogLevel::Warn,
                "monitor",
                "block",
                format!("{} {} blocked: {}", kind_label, ip, reason),
            ),
        );
        changed
    }

    fn remove_block(&self, id: &str, actor: Option<String>, is_ip: bool) -> bool {
        let set = if is_ip { &self.blocked_ips } else { &self.blocked_users };
        let changed = set.remove(id).is_some();
        let kind_label = if is_ip { "ip" } else { "user" };
        metrics::set_blocked_total(kind_label, set.len());

        let audit = SecurityEvent::new(
            SecurityEventKind::AdminAction {
                action: format!("unblock-{}", kind_label),
                target: id.to_string(),
            },
            EventContext {
                ip: if is_ip { id.to_string() } else { String::new() },
                user_id: if is_ip { None } else { Some(id.to_string()) },
                ..EventContext::default()
            },
        );
        self.report_event(audit.with_severity(Severity::High));
        self.store.push_log(LogEntry::new(
            LogLevel::Warn,
            "monitor",
            "unblock",
            format!(
                "{} {} unblocked by {}",
                kind_label,
                id,
                actor.as_deref().unwrap_or("unknown")
            ),
        ));
        changed
    }

    /// Block an IP. Idempotent; returns whether membership changed.
    pub fn block_ip(&self, ip: &str, reason: &str, actor: Option<String>) -> bool {
        self.insert_block(ip, reason, actor, true)
    }

    pub fn unblock_ip(&self, ip: &str, actor: Option<String>) -> bool {
        self.remove_block(ip, actor, true)
    }

    pub fn block_user(&self, user_id: &str, reason: &str, actor: Option<String>) -> bool {
        self.insert_block(user_id, reason, actor, false)
    }

    pub fn unblock_user(&self, user_id: &str, actor: Option<String>) -> bool {
        self.remove_block(user_id, actor, false)
    }

    pub fn is_ip_blocked(&self, ip: &str) -> bool {
        self.blocked_ips.contains_key(ip)
    }

    pub fn is_user_blocked(&self, user_id: &str) -> bool {
        self.blocked_users.contains_key(user_id)
    }

    /// Snapshot of the active block lists (ips, users).
    pub fn blocked_identities(&self) -> (Vec<(String, BlockEntry)>, Vec<(String, BlockEntry)>) {
        let ips = self
            .blocked_ips
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let users = self
            .blocked_users
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        (ips, users)
    }

    /// Derived analysis for an IP; `None` when no history is retained.
    pub fn get_ip_analysis(&self, ip: &str) -> Option<IpAnalysis> {
        let events = self.store.query_events(&EventFilter {
            ip: Some(ip.to_string()),
            ..EventFilter::default()
        });
        analyze_ip(ip, &events)
    }

    /// Derived analysis for a user; `None` when no history is retained.
    pub fn get_user_analysis(&self, user_id: &str) -> Option<UserAnalysis> {
        let events = self.store.query_events(&EventFilter {
            user_id: Some(user_id.to_string()),
            ..EventFilter::default()
        });
        let logs = self.store.query_logs(&LogFilter {
            user_id: Some(user_id.to_string()),
            ..LogFilter::default()
        });
        analyze_user(user_id, &events, &logs)
    }

    /// Aggregate counters for the dashboard.
    pub fn stats(&self) -> MonitoringStats {
        let suspicious = self
            .store
            .recent_events(usize::MAX)
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    SecurityEventKind::SuspiciousActivity { .. }
                        | SecurityEventKind::SlowResponse { .. }
                )
            })
            .count();
        MonitoringStats {
            total_events: self.store.event_count(),
            blocked_ips: self.blocked_ips.len(),
            blocked_users: self.blocked_users.len(),
            suspicious_activities: suspicious,
            detection_rules: self.detection_rules.load(std::sync::atomic::Ordering::Relaxed),
        }
    }

    /// Destructive clear of stored data. Requires an explicit confirmation
    /// flag; audited before execution.
    pub fn clear_data(
        &self,
        target: ClearTarget,
        confirm: bool,
        actor: Option<String>,
    ) -> Result<(), AdmissionError> {
        if !confirm {
            return Err(AdmissionError::Validation(
                "confirmation flag required for destructive clear".into(),
            ));
        }

        let description = format!("clearing stored data: {:?}", target);
        self.store.push_log(LogEntry::new(
            LogLevel::Critical,
            "monitor",
            "clear",
            description.clone(),
        ));
        let audit = SecurityEvent::new(
            SecurityEventKind::AdminAction {
                action: "clear-data".to_string(),
                target: format!("{:?}", target).to_lowercase(),
            },
            EventContext {
                user_id: actor.clone(),
                ..EventContext::default()
            },
        );
        self.report_event(audit.with_severity(Severity::High));

        self.store.clear(target);

        // Leave a marker so the action remains traceable after the wipe.
        self.store.push_log(LogEntry::new(
            LogLevel::Critical,
            "monitor",
            "clear",
            format!("data cleared by {}: {:?}", actor.as_deref().unwrap_or("unknown"), target),
        ));
        Ok(())
    }
}
