//! CSRF protection via the double-submit token pattern.
//!
//! The same random token must appear in both the cookie and a request
//! header for a mutating request to be accepted. A request with no cookie
//! yet is always passed and gets a token set: the very first mutating call
//! from a fresh client cannot carry a matching header.

use arc_swap::ArcSwap;
use axum::http::Method;
use constant_time_eq::constant_time_eq;
use rand::RngCore;

use crate::config::schema::CsrfConfig;

/// Outcome of a CSRF check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfOutcome {
    /// Request passes unchanged.
    Pass,
    /// First contact: pass the request and set this token as the cookie.
    Bootstrap(String),
    /// Token missing or mismatched; reject and report.
    Reject(CsrfRejection),
}

/// Why a CSRF check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfRejection {
    MissingHeader,
    TokenMismatch,
}

impl CsrfRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            CsrfRejection::MissingHeader => "missing csrf header token",
            CsrfRejection::TokenMismatch => "csrf token mismatch",
        }
    }
}

/// Double-submit CSRF guard.
pub struct CsrfGuard {
    config: ArcSwap<CsrfConfig>,
}

impl CsrfGuard {
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn apply_config(&self, config: CsrfConfig) {
        self.config.store(std::sync::Arc::new(config));
    }

    pub fn header_name(&self) -> String {
        self.config.load().header_name.clone()
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.config
            .load()
            .exempt_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Pull our token out of a raw `Cookie` header value.
    pub fn extract_cookie_token(&self, cookie_header: Option<&str>) -> Option<String> {
        let name = self.config.load().cookie_name.clone();
        let header = cookie_header?;
        for pair in header.split(';') {
            let pair = pair.trim();
            if let Some((key, value)) = pair.split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
        None
    }

    /// Build the `Set-Cookie` value for a freshly issued token.
    pub fn cookie_value(&self, token: &str) -> String {
        let config = self.config.load();
        let mut value = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict",
            config.cookie_name, token
        );
        if config.secure_cookies {
            value.push_str("; Secure");
        }
        value
    }

    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Validate one request. Only state-mutating methods on non-exempt
    /// paths are checked; everything else passes.
    pub fn protect(
        &self,
        method: &Method,
        path: &str,
        cookie_token: Option<&str>,
        header_token: Option<&str>,
    ) -> CsrfOutcome {
        if !self.config.load().enabled {
            return CsrfOutcome::Pass;
        }
        if !matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        ) {
            return CsrfOutcome::Pass;
        }
        if self.is_exempt(path) {
            return CsrfOutcome::Pass;
        }

        let cookie = match cookie_token {
            Some(token) if !token.is_empty() => token,
            // Bootstrap exception: establish a token on first contact.
            _ => return CsrfOutcome::Bootstrap(Self::generate_token()),
        };

        match header_token {
            None => CsrfOutcome::Reject(CsrfRejection::MissingHeader),
            Some(header) => {
                if constant_time_eq(cookie.as_bytes(), header.as_bytes()) {
                    CsrfOutcome::Pass
                } else {
                    CsrfOutcome::Reject(CsrfRejection::TokenMismatch)
                }
            }
        }
    }
}
