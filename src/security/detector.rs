//! Attack signature detection over serialized request content.
//!
//! Purely informational: a match is reported to the monitor, never used to
//! reject the request on its own. False positives are expected.

use regex::Regex;

use crate::config::schema::DetectorConfig;

/// Built-in signatures, checked in order. First match wins.
const BUILTIN_PATTERNS: &[&str] = &[
    // Script-tag injection
    r"(?i)<script\b",
    r"(?i)</script>",
    // Dangerous URI schemes
    r"(?i)javascript:",
    r"(?i)data:text/html",
    r"(?i)vbscript:",
    // SQL keyword injection
    r"(?i)union[\s/*]+select",
    r"(?i)drop\s+table",
    r"(?i)insert\s+into",
    r"(?i)delete\s+from",
    r"(?i)\bor\s+1\s*=\s*1\b",
    // Path traversal
    r"\.\./",
    r"\.\.\\",
    // Dynamic code execution
    r"(?i)\beval\s*\(",
    r"(?i)\bsetTimeout\s*\(",
    r"(?i)\bsetInterval\s*\(",
];

/// Ordered signature scanner.
pub struct SignatureDetector {
    patterns: Vec<Regex>,
    enabled: bool,
}

impl SignatureDetector {
    /// Compile the built-in patterns plus any configured extras. Invalid
    /// extras are skipped with a warning (validation rejects them earlier
    /// on the config path).
    pub fn new(config: &DetectorConfig) -> Self {
        let mut patterns: Vec<Regex> = BUILTIN_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("built-in signature must compile"))
            .collect();
        for extra in &config.extra_patterns {
            match Regex::new(extra) {
                Ok(regex) => patterns.push(regex),
                Err(e) => {
                    tracing::warn!(pattern = %extra, error = %e, "Skipping invalid detector pattern");
                }
            }
        }
        Self {
            patterns,
            enabled: config.enabled,
        }
    }

    /// Scan a serialized request blob. Returns the source text of the
    /// FIRST matching signature, short-circuiting the rest.
    pub fn scan(&self, blob: &str) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.patterns
            .iter()
            .find(|regex| regex.is_match(blob))
            .map(|regex| regex.as_str())
    }

    pub fn rule_count(&self) -> usize {
        self.patterns.len()
    }
}
