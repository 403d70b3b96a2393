//! Derived per-identity risk analyses.
//!
//! Analyses are computed on demand from the retained event/log history and
//! never persisted. All scoring is deterministic threshold arithmetic so
//! results are reproducible and testable.

use std::collections::HashSet;

use serde::Serialize;

use crate::monitor::event::{LogEntry, SecurityEvent, SecurityEventKind};

/// Behavioral summary for a source IP.
#[derive(Debug, Clone, Serialize)]
pub struct IpAnalysis {
    pub ip: String,
    /// Brute-force and CSRF failures attributed to this IP.
    pub failed_attempts: u32,
    /// Average gap between consecutive retained events; `None` with fewer
    /// than two events.
    pub avg_request_interval_ms: Option<u64>,
    pub unique_user_agents: u32,
    pub risk_score: u8,
    pub risk_factors: Vec<String>,
}

/// Behavioral summary for a user account.
#[derive(Debug, Clone, Serialize)]
pub struct UserAnalysis {
    pub user_id: String,
    pub failed_logins: u32,
    pub privilege_escalation_attempts: u32,
    pub session_count: u32,
    pub risk_score: u8,
    pub risk_factors: Vec<String>,
}

fn average_interval_ms(events: &[SecurityEvent]) -> Option<u64> {
    if events.len() < 2 {
        return None;
    }
    // Events arrive newest first.
    let total: u64 = events
        .windows(2)
        .map(|pair| pair[0].timestamp_ms.saturating_sub(pair[1].timestamp_ms))
        .sum();
    Some(total / (events.len() as u64 - 1))
}

/// Analyze retained events for one IP. `None` when there is no history,
/// which callers must distinguish from a zero-risk result.
pub fn analyze_ip(ip: &str, events: &[SecurityEvent]) -> Option<IpAnalysis> {
    if events.is_empty() {
        return None;
    }

    let failed_attempts = events
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                SecurityEventKind::BruteForceAttempt { .. }
                    | SecurityEventKind::CsrfViolation { .. }
            )
        })
        .count() as u32;

    let unique_user_agents = events
        .iter()
        .filter_map(|e| e.context.user_agent.as_deref())
        .collect::<HashSet<_>>()
        .len() as u32;

    let avg_request_interval_ms = average_interval_ms(events);

    let base: u32 = events.iter().map(|e| e.risk_score as u32).sum::<u32>() / events.len() as u32;
    let mut score = base;
    if failed_attempts > 10 {
        score += 20;
    }
    if matches!(avg_request_interval_ms, Some(ms) if ms < 1000) {
        score += 15;
    }
    if unique_user_agents > 5 {
        score += 10;
    }
    let risk_score = score.min(100) as u8;

    let mut risk_factors = Vec::new();
    if risk_score >= 70 {
        risk_factors.push("high risk score".to_string());
    }
    if failed_attempts > 10 {
        risk_factors.push("elevated failed attempts (possible brute force)".to_string());
    }
    if matches!(avg_request_interval_ms, Some(ms) if ms < 1000) {
        risk_factors.push("very high request frequency (automated scanning)".to_string());
    }
    if unique_user_agents > 5 {
        risk_factors.push("multiple user agents (proxy or bot network)".to_string());
    }

    Some(IpAnalysis {
        ip: ip.to_string(),
        failed_attempts,
        avg_request_interval_ms,
        unique_user_agents,
        risk_score,
        risk_factors,
    })
}

/// Analyze retained events and logs for one user account.
pub fn analyze_user(user_id: &str, events: &[SecurityEvent], logs: &[LogEntry]) -> Option<UserAnalysis> {
    if events.is_empty() && logs.is_empty() {
        return None;
    }

    let failed_logins = events
        .iter()
        .filter(|e| matches!(e.kind, SecurityEventKind::BruteForceAttempt { .. }))
        .count() as u32;

    let privilege_escalation_attempts = events
        .iter()
        .filter(|e| matches!(e.kind, SecurityEventKind::UnauthorizedAccess { .. }))
        .count() as u32;

    let session_count = logs
        .iter()
        .filter_map(|l| l.session_id.as_deref())
        .collect::<HashSet<_>>()
        .len() as u32;

    let mut score = failed_logins * 12 + privilege_escalation_attempts * 15;
    if session_count > 5 {
        score += 15;
    }
    let risk_score = score.min(100) as u8;

    let mut risk_factors = Vec::new();
    if risk_score >= 70 {
        risk_factors.push("high risk score".to_string());
    }
    if failed_logins > 5 {
        risk_factors.push("repeated failed logins (possible account compromise)".to_string());
    }
    if privilege_escalation_attempts > 3 {
        risk_factors.push("privilege escalation attempts (access-control probing)".to_string());
    }
    if session_count > 5 {
        risk_factors.push("many concurrent sessions (possible credential sharing)".to_string());
    }

    Some(UserAnalysis {
        user_id: user_id.to_string(),
        failed_logins,
        privilege_escalation_attempts,
        session_count,
        risk_score,
        risk_factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::event::{EventContext, LogLevel};

    fn brute_force(ip: &str, at_ms: u64, ua: Option<&str>) -> SecurityEvent {
        let mut event = SecurityEvent::new(
            SecurityEventKind::BruteForceAttempt {
                target: "victim@example.com".into(),
                limit: 5,
                window_ms: 900_000,
            },
            EventContext {
                ip: ip.to_string(),
                user_agent: ua.map(|s| s.to_string()),
                ..EventContext::default()
            },
        );
        event.timestamp_ms = at_ms;
        event
    }

    #[test]
    fn no_history_is_none_not_zero() {
        assert!(analyze_ip("10.0.0.1", &[]).is_none());
        assert!(analyze_user("u1", &[], &[]).is_none());
    }

    #[test]
    fn brute_force_and_scanning_factors() {
        // Newest first, 500ms apart: automated-scanning signal.
        let events: Vec<_> = (0..12)
            .map(|i| brute_force("10.0.0.9", 100_000 - i * 500, Some("curl/8")))
            .collect();

        let analysis = analyze_ip("10.0.0.9", &events).unwrap();
        assert_eq!(analysis.failed_attempts, 12);
        assert_eq!(analysis.avg_request_interval_ms, Some(500));
        assert!(analysis.risk_score >= 70);
        assert!(analysis
            .risk_factors
            .iter()
            .any(|f| f.contains("brute force")));
        assert!(analysis
            .risk_factors
            .iter()
            .any(|f| f.contains("automated scanning")));
    }

    #[test]
    fn user_agent_diversity_flags_proxy() {
        let events: Vec<_> = (0..6)
            .map(|i| brute_force("10.0.0.9", 100_000 - i * 5000, Some(&format!("ua-{}", i))))
            .collect();
        let analysis = analyze_ip("10.0.0.9", &events).unwrap();
        assert_eq!(analysis.unique_user_agents, 6);
        assert!(analysis
            .risk_factors
            .iter()
            .any(|f| f.contains("proxy or bot")));
    }

    #[test]
    fn user_analysis_counts_sessions_from_logs() {
        let events = vec![brute_force("10.0.0.9", 1000, None)];
        let logs: Vec<_> = (0..6)
            .map(|i| {
                let mut entry =
                    LogEntry::new(LogLevel::Info, "auth", "login", "session opened")
                        .with_user("u1");
                entry.session_id = Some(format!("s-{}", i));
                entry
            })
            .collect();

        let analysis = analyze_user("u1", &events, &logs).unwrap();
        assert_eq!(analysis.failed_logins, 1);
        assert_eq!(analysis.session_count, 6);
        assert!(analysis
            .risk_factors
            .iter()
            .any(|f| f.contains("credential sharing")));
    }
}
