//! Security event and log entry types.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Log entry level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

/// The kind of a security event, with a structured payload per variant.
///
/// Closed enum: every event kind's fields are statically known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SecurityEventKind {
    /// General-traffic rate limit tripped.
    RateLimitExceeded { policy: String, limit: u32, window_ms: u64 },

    /// Auth-traffic rate limit tripped against a credential target.
    BruteForceAttempt { target: String, limit: u32, window_ms: u64 },

    /// Heuristic finding (signature match, CSRF anomaly context, probes).
    SuspiciousActivity {
        reason: String,
        /// Source text of the matched signature, when one triggered this.
        pattern: Option<String>,
    },

    /// Double-submit token check failed on a mutating request.
    CsrfViolation { reason: String },

    /// Response exceeded the watchdog threshold.
    SlowResponse { duration_ms: u64, threshold_ms: u64 },

    /// Role-gated admin action attempted without sufficient credentials.
    UnauthorizedAccess { action: String },

    /// Audit record for block/unblock/clear commands and auto-escalations.
    AdminAction { action: String, target: String },
}

impl SecurityEventKind {
    /// Stable string label, matching the serde tag.
    pub fn label(&self) -> &'static str {
        match self {
            SecurityEventKind::RateLimitExceeded { .. } => "rate-limit-exceeded",
            SecurityEventKind::BruteForceAttempt { .. } => "brute-force-attempt",
            SecurityEventKind::SuspiciousActivity { .. } => "suspicious-activity",
            SecurityEventKind::CsrfViolation { .. } => "csrf-violation",
            SecurityEventKind::SlowResponse { .. } => "slow-response",
            SecurityEventKind::UnauthorizedAccess { .. } => "unauthorized-access",
            SecurityEventKind::AdminAction { .. } => "admin-action",
        }
    }

    /// Default severity for this kind.
    pub fn default_severity(&self) -> Severity {
        match self {
            SecurityEventKind::RateLimitExceeded { .. } => Severity::Medium,
            SecurityEventKind::BruteForceAttempt { .. } => Severity::High,
            SecurityEventKind::SuspiciousActivity { .. } => Severity::High,
            SecurityEventKind::CsrfViolation { .. } => Severity::Medium,
            SecurityEventKind::SlowResponse { .. } => Severity::Low,
            SecurityEventKind::UnauthorizedAccess { .. } => Severity::Medium,
            SecurityEventKind::AdminAction { .. } => Severity::High,
        }
    }

    /// Base risk contribution (0-100) of a single event of this kind.
    pub fn base_risk(&self) -> u8 {
        match self {
            SecurityEventKind::RateLimitExceeded { .. } => 30,
            SecurityEventKind::BruteForceAttempt { .. } => 60,
            SecurityEventKind::SuspiciousActivity { .. } => 50,
            SecurityEventKind::CsrfViolation { .. } => 40,
            SecurityEventKind::SlowResponse { .. } => 20,
            SecurityEventKind::UnauthorizedAccess { .. } => 35,
            SecurityEventKind::AdminAction { .. } => 0,
        }
    }
}

/// Request context attached to a security event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    pub ip: String,
    pub user_id: Option<String>,
    pub path: String,
    pub method: String,
    pub user_agent: Option<String>,
}

/// An immutable security event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub context: EventContext,
    /// 0-100 summary of how suspicious this single event is.
    pub risk_score: u8,
    /// Whether the triggering request was rejected.
    pub blocked: bool,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, context: EventContext) -> Self {
        let severity = kind.default_severity();
        let risk_score = kind.base_risk();
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            timestamp_ms: now_ms(),
            context,
            risk_score,
            blocked: false,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }
}

/// A structured application log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub level: LogLevel,
    pub timestamp_ms: u64,
    pub message: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub component: String,
    pub action: String,
    pub duration_ms: Option<u64>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: &str, action: &str, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            timestamp_ms: now_ms(),
            message: message.into(),
            user_id: None,
            session_id: None,
            component: component.to_string(),
            action: action.to_string(),
            duration_ms: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}
