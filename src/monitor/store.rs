//! Bounded, queryable store for log entries and security events.
//!
//! Two independent sequences, newest first. Appending beyond capacity
//! evicts the oldest entry (FIFO). Append-and-evict is atomic per
//! sequence; readers get snapshots.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::AdmissionError;
use crate::monitor::event::{LogEntry, LogLevel, SecurityEvent, Severity};

/// Conjunctive filter over security events. Unset fields match anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub severity: Option<Severity>,
    /// Kind label, e.g. "rate-limit-exceeded".
    pub kind: Option<String>,
    /// Inclusive lower bound on timestamp.
    pub from_ms: Option<u64>,
    /// Inclusive upper bound on timestamp.
    pub to_ms: Option<u64>,
    pub ip: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

impl EventFilter {
    fn matches(&self, event: &SecurityEvent) -> bool {
        if let Some(severity) = self.severity {
            if event.severity != severity {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            if event.kind.label() != kind {
                return false;
            }
        }
        if let Some(from) = self.from_ms {
            if event.timestamp_ms < from {
                return false;
            }
        }
        if let Some(to) = self.to_ms {
            if event.timestamp_ms > to {
                return false;
            }
        }
        if let Some(ip) = &self.ip {
            if &event.context.ip != ip {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if event.context.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Conjunctive filter over log entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub from_ms: Option<u64>,
    pub to_ms: Option<u64>,
    pub user_id: Option<String>,
    pub component: Option<String>,
    pub limit: Option<usize>,
}

impl LogFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(from) = self.from_ms {
            if entry.timestamp_ms < from {
                return false;
            }
        }
        if let Some(to) = self.to_ms {
            if entry.timestamp_ms > to {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if entry.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(component) = &self.component {
            if &entry.component != component {
                return false;
            }
        }
        true
    }
}

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Which sequences a clear operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearTarget {
    Logs,
    Events,
    All,
}

/// Bounded in-memory store for the two audit sequences.
pub struct EventStore {
    logs: Mutex<VecDeque<LogEntry>>,
    events: Mutex<VecDeque<SecurityEvent>>,
    log_capacity: usize,
    event_capacity: usize,
}

impl EventStore {
    pub fn new(log_capacity: usize, event_capacity: usize) -> Self {
        Self {
            logs: Mutex::new(VecDeque::with_capacity(log_capacity.min(1024))),
            events: Mutex::new(VecDeque::with_capacity(event_capacity.min(1024))),
            log_capacity,
            event_capacity,
        }
    }

    /// Append a log entry, evicting the oldest beyond capacity.
    pub fn push_log(&self, entry: LogEntry) {
        let mut logs = self.logs.lock().expect("log store mutex poisoned");
        logs.push_front(entry);
        while logs.len() > self.log_capacity {
            logs.pop_back();
        }
    }

    /// Append a security event, evicting the oldest beyond capacity.
    pub fn push_event(&self, event: SecurityEvent) {
        let mut events = self.events.lock().expect("event store mutex poisoned");
        events.push_front(event);
        while events.len() > self.event_capacity {
            events.pop_back();
        }
    }

    /// Most recent events matching the filter, newest first.
    pub fn query_events(&self, filter: &EventFilter) -> Vec<SecurityEvent> {
        let events = self.events.lock().expect("event store mutex poisoned");
        let limit = filter.limit.unwrap_or(usize::MAX);
        events
            .iter()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Most recent log entries matching the filter, newest first.
    pub fn query_logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let logs = self.logs.lock().expect("log store mutex poisoned");
        let limit = filter.limit.unwrap_or(usize::MAX);
        logs.iter()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect()
    }

    /// The `n` most recent events, unfiltered.
    pub fn recent_events(&self, n: usize) -> Vec<SecurityEvent> {
        let events = self.events.lock().expect("event store mutex poisoned");
        events.iter().take(n).cloned().collect()
    }

    pub fn log_count(&self) -> usize {
        self.logs.lock().expect("log store mutex poisoned").len()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().expect("event store mutex poisoned").len()
    }

    /// Clear the targeted sequences. The caller is responsible for the
    /// confirmation check and for auditing the action first.
    pub fn clear(&self, target: ClearTarget) {
        match target {
            ClearTarget::Logs => {
                self.logs.lock().expect("log store mutex poisoned").clear();
            }
            ClearTarget::Events => {
                self.events.lock().expect("event store mutex poisoned").clear();
            }
            ClearTarget::All => {
                self.logs.lock().expect("log store mutex poisoned").clear();
                self.events.lock().expect("event store mutex poisoned").clear();
            }
        }
    }

    /// Export both sequences.
    ///
    /// `include_context = false` strips every field outside the minimal
    /// schema: logs keep id, level, timestamp, message and ids; events keep
    /// id, type, severity, timestamp, ip and user id.
    pub fn export(
        &self,
        format: ExportFormat,
        include_context: bool,
    ) -> Result<String, AdmissionError> {
        let logs: Vec<LogEntry> = {
            let guard = self.logs.lock().expect("log store mutex poisoned");
            guard.iter().cloned().collect()
        };
        let events: Vec<SecurityEvent> = {
            let guard = self.events.lock().expect("event store mutex poisoned");
            guard.iter().cloned().collect()
        };

        match format {
            ExportFormat::Json => export_json(&logs, &events, include_context),
            ExportFormat::Csv => export_csv(&logs, &events, include_context),
        }
    }
}

fn export_json(
    logs: &[LogEntry],
    events: &[SecurityEvent],
    include_context: bool,
) -> Result<String, AdmissionError> {
    let body = if include_context {
        json!({ "logs": logs, "security_events": events })
    } else {
        let logs: Vec<_> = logs
            .iter()
            .map(|l| {
                json!({
                    "id": l.id,
                    "level": l.level,
                    "timestamp_ms": l.timestamp_ms,
                    "message": l.message,
                    "user_id": l.user_id,
                    "session_id": l.session_id,
                })
            })
            .collect();
        let events: Vec<_> = events
            .iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "type": e.kind.label(),
                    "severity": e.severity,
                    "timestamp_ms": e.timestamp_ms,
                    "ip": e.context.ip,
                    "user_id": e.context.user_id,
                })
            })
            .collect();
        json!({ "logs": logs, "security_events": events })
    };
    serde_json::to_string_pretty(&body)
        .map_err(|e| AdmissionError::Validation(format!("export serialization failed: {}", e)))
}

fn export_csv(
    logs: &[LogEntry],
    events: &[SecurityEvent],
    include_context: bool,
) -> Result<String, AdmissionError> {
    let csv_err =
        |e: csv::Error| AdmissionError::Validation(format!("csv export failed: {}", e));
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();

    // Flexible: the two sections have different column counts.
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    if include_context {
        writer
            .write_record([
                "id", "level", "timestamp_ms", "message", "user_id", "session_id", "component",
                "action", "duration_ms",
            ])
            .map_err(csv_err)?;
        for l in logs {
            writer
                .write_record([
                    l.id.to_string(),
                    format!("{:?}", l.level).to_lowercase(),
                    l.timestamp_ms.to_string(),
                    l.message.clone(),
                    opt(&l.user_id),
                    opt(&l.session_id),
                    l.component.clone(),
                    l.action.clone(),
                    l.duration_ms.map(|d| d.to_string()).unwrap_or_default(),
                ])
                .map_err(csv_err)?;
        }
    } else {
        writer
            .write_record(["id", "level", "timestamp_ms", "message", "user_id", "session_id"])
            .map_err(csv_err)?;
        for l in logs {
            writer
                .write_record([
                    l.id.to_string(),
                    format!("{:?}", l.level).to_lowercase(),
                    l.timestamp_ms.to_string(),
                    l.message.clone(),
                    opt(&l.user_id),
                    opt(&l.session_id),
                ])
                .map_err(csv_err)?;
        }
    }

    // Section break between logs and security events.
    writer.write_record([""]).map_err(csv_err)?;

    if include_context {
        writer
            .write_record([
                "id", "type", "severity", "timestamp_ms", "ip", "user_id", "path", "method",
                "user_agent", "risk_score", "blocked", "details",
            ])
            .map_err(csv_err)?;
        for e in events {
            let details = serde_json::to_string(&e.kind).unwrap_or_default();
            writer
                .write_record([
                    e.id.to_string(),
                    e.kind.label().to_string(),
                    format!("{:?}", e.severity).to_lowercase(),
                    e.timestamp_ms.to_string(),
                    e.context.ip.clone(),
                    opt(&e.context.user_id),
                    e.context.path.clone(),
                    e.context.method.clone(),
                    opt(&e.context.user_agent),
                    e.risk_score.to_string(),
                    e.blocked.to_string(),
                    details,
                ])
                .map_err(csv_err)?;
        }
    } else {
        writer
            .write_record(["id", "type", "severity", "timestamp_ms", "ip", "user_id"])
            .map_err(csv_err)?;
        for e in events {
            writer
                .write_record([
                    e.id.to_string(),
                    e.kind.label().to_string(),
                    format!("{:?}", e.severity).to_lowercase(),
                    e.timestamp_ms.to_string(),
                    e.context.ip.clone(),
                    opt(&e.context.user_id),
                ])
                .map_err(csv_err)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AdmissionError::Validation(format!("csv export failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AdmissionError::Validation(format!("csv export not utf-8: {}", e)))
}
