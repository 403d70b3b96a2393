//! Admission orchestrator.
//!
//! One ordered state machine per request, terminal on first rejection:
//!
//! ```text
//! Start → RateLimit → {reject | CSRFCheck} → {reject | Sanitize}
//!       → MonitorHook (async, non-blocking) → Forward → Watchdog
//! ```
//!
//! Hardening headers are applied by an outer layer (`security::headers`) so
//! rejected responses carry them too. Every rejection reports its event
//! before returning and leaks no internal detail. Detector findings and
//! slow-response reports are fire-and-forget: they complete even if the
//! client goes away.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, uri::PathAndQuery, Request, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::GatewayConfig;
use crate::errors::AdmissionError;
use crate::monitor::event::{EventContext, SecurityEvent, SecurityEventKind};
use crate::monitor::SecurityMonitor;
use crate::observability::metrics;
use crate::security::csrf::CsrfOutcome;
use crate::security::sanitize::{sanitize_query, sanitize_value};
use crate::security::{CsrfGuard, RateLimiter, RatePolicy, SignatureDetector};

/// Client IP attached to admitted requests.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// Auth-policy identity attached to admitted auth requests, so the login
/// handler can mark a successful attempt (skip-on-success).
#[derive(Debug, Clone)]
pub struct AuthIdentity(pub String);

/// Shared state for the admission middleware.
#[derive(Clone)]
pub struct AdmissionState {
    pub limiter: Arc<RateLimiter>,
    pub csrf: Arc<CsrfGuard>,
    pub detector: Arc<SignatureDetector>,
    pub monitor: Arc<SecurityMonitor>,
    pub config: Arc<ArcSwap<GatewayConfig>>,
}

impl AdmissionState {
    fn context(
        &self,
        ip: &str,
        user_id: Option<&str>,
        path: &str,
        method: &str,
        user_agent: Option<&str>,
    ) -> EventContext {
        EventContext {
            ip: ip.to_string(),
            user_id: user_id.map(|s| s.to_string()),
            path: path.to_string(),
            method: method.to_string(),
            user_agent: user_agent.map(|s| s.to_string()),
        }
    }
}

fn header_str<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Pull the credential identifier out of a login body, if any.
fn credential_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("email")
        .or_else(|| value.get("username"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// The admission pipeline, applied to every inbound request before any
/// business handler executes.
pub async fn admission_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AdmissionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let raw_query = request.uri().query().unwrap_or("").to_string();
    let user_agent = header_str(&request, "user-agent").map(|s| s.to_string());
    // Verified identity claim from the host's auth layer, when present.
    let user_id = header_str(&request, "x-user-id").map(|s| s.to_string());

    // Block lists reflect immediately in admission checks.
    if state.monitor.is_ip_blocked(&ip) {
        metrics::record_admission("blocked_ip");
        tracing::warn!(client = %ip, path = %path, "Rejected blocked IP");
        return AdmissionError::Blocked.into_response();
    }
    if let Some(user) = &user_id {
        if state.monitor.is_user_blocked(user) {
            metrics::record_admission("blocked_user");
            tracing::warn!(client = %ip, user = %user, "Rejected blocked user");
            return AdmissionError::Blocked.into_response();
        }
    }

    // Buffer the body once for rate-limit identity, sanitization and the
    // signature scan.
    let config = state.config.load_full();
    let (mut parts, body) = request.into_parts();
    let body_bytes = match to_bytes(body, config.listener.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            metrics::record_admission("body_too_large");
            return AdmissionError::Validation("request body too large".into()).into_response();
        }
    };

    // Rate limit. Auth traffic keys on the targeted credential + IP.
    let is_auth_path = config
        .rate_limit
        .auth_paths
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()));
    let (policy, identity) = if is_auth_path {
        let credential = credential_from_body(&body_bytes);
        (
            RatePolicy::Auth,
            RateLimiter::auth_identity(credential.as_deref(), &ip),
        )
    } else {
        (RatePolicy::General, ip.clone())
    };

    let decision = state.limiter.admit(&identity, policy);
    if !decision.allowed {
        let kind = match policy {
            RatePolicy::General => {
                metrics::record_rate_limited("general");
                SecurityEventKind::RateLimitExceeded {
                    policy: "general".into(),
                    limit: decision.limit,
                    window_ms: decision.window_ms,
                }
            }
            RatePolicy::Auth => {
                metrics::record_rate_limited("auth");
                SecurityEventKind::BruteForceAttempt {
                    target: identity.clone(),
                    limit: decision.limit,
                    window_ms: decision.window_ms,
                }
            }
        };
        let context = state.context(
            &ip,
            user_id.as_deref(),
            &path,
            method.as_str(),
            user_agent.as_deref(),
        );
        state
            .monitor
            .report_event(SecurityEvent::new(kind, context).with_blocked(true));
        return AdmissionError::RateLimited {
            retry_after: decision.retry_after.unwrap_or_default(),
        }
        .into_response();
    }

    // CSRF double-submit check for mutating methods.
    let cookie_header = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let cookie_token = state.csrf.extract_cookie_token(cookie_header);
    let header_token = parts
        .headers
        .get(state.csrf.header_name())
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let mut bootstrap_token = None;
    match state.csrf.protect(
        &method,
        &path,
        cookie_token.as_deref(),
        header_token.as_deref(),
    ) {
        CsrfOutcome::Pass => {}
        CsrfOutcome::Bootstrap(token) => bootstrap_token = Some(token),
        CsrfOutcome::Reject(rejection) => {
            metrics::record_admission("csrf_rejected");
            let context = state.context(
                &ip,
                user_id.as_deref(),
                &path,
                method.as_str(),
                user_agent.as_deref(),
            );
            state.monitor.report_event(
                SecurityEvent::new(
                    SecurityEventKind::CsrfViolation {
                        reason: rejection.reason().to_string(),
                    },
                    context,
                )
                .with_blocked(true),
            );
            return AdmissionError::CsrfInvalid.into_response();
        }
    }

    // Fire-and-forget signature scan over the raw (pre-sanitization)
    // content. The query is included in decoded form as well, so
    // percent-encoded payloads still hit the signatures. Findings inform
    // the monitor; they never reject here.
    let decoded_query: String = form_urlencoded::parse(raw_query.as_bytes())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let blob = format!(
        "{} {} {} {} {}",
        method,
        path,
        raw_query,
        decoded_query,
        String::from_utf8_lossy(&body_bytes)
    );
    {
        let detector = state.detector.clone();
        let monitor = state.monitor.clone();
        let context = state.context(
            &ip,
            user_id.as_deref(),
            &path,
            method.as_str(),
            user_agent.as_deref(),
        );
        tokio::spawn(async move {
            if let Some(pattern) = detector.scan(&blob) {
                monitor.report_event(SecurityEvent::new(
                    SecurityEventKind::SuspiciousActivity {
                        reason: "attack signature match".into(),
                        pattern: Some(pattern.to_string()),
                    },
                    context,
                ));
            }
        });
    }

    // Sanitize string leaves in the query and any JSON body. Structure is
    // preserved; only string content changes.
    if !raw_query.is_empty() {
        let sanitized_query = sanitize_query(&raw_query);
        if sanitized_query != raw_query {
            let path_and_query = format!("{}?{}", path, sanitized_query);
            if let Ok(pq) = path_and_query.parse::<PathAndQuery>() {
                let mut uri_parts = parts.uri.clone().into_parts();
                uri_parts.path_and_query = Some(pq);
                if let Ok(uri) = Uri::from_parts(uri_parts) {
                    parts.uri = uri;
                }
            }
        }
    }

    let is_json = header_str_from(&parts.headers, header::CONTENT_TYPE.as_str())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    let forwarded_body = if is_json && !body_bytes.is_empty() {
        match serde_json::from_slice::<serde_json::Value>(&body_bytes) {
            Ok(value) => {
                let sanitized = sanitize_value(value);
                let bytes = serde_json::to_vec(&sanitized).unwrap_or_else(|_| body_bytes.to_vec());
                if let Ok(len) = bytes.len().to_string().parse() {
                    parts.headers.insert(header::CONTENT_LENGTH, len);
                }
                Body::from(bytes)
            }
            // Malformed JSON is left for the handler's extractor to reject.
            Err(_) => Body::from(body_bytes.clone()),
        }
    } else {
        Body::from(body_bytes.clone())
    };

    parts.extensions.insert(ClientIp(ip.clone()));
    if policy == RatePolicy::Auth {
        parts.extensions.insert(AuthIdentity(identity.clone()));
    }

    let request = Request::from_parts(parts, forwarded_body);

    // Forward, with the response-time watchdog wrapped around completion.
    let start = Instant::now();
    let mut response = next.run(request).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let threshold_ms = config.watchdog.slow_response_ms;
    if elapsed_ms > threshold_ms {
        let monitor = state.monitor.clone();
        let context = state.context(
            &ip,
            user_id.as_deref(),
            &path,
            method.as_str(),
            user_agent.as_deref(),
        );
        tokio::spawn(async move {
            monitor.report_event(SecurityEvent::new(
                SecurityEventKind::SlowResponse {
                    duration_ms: elapsed_ms,
                    threshold_ms,
                },
                context,
            ));
        });
    }

    if let Some(token) = bootstrap_token {
        if let Ok(value) = state.csrf.cookie_value(&token).parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    metrics::record_admission("allowed");
    response
}

fn header_str_from<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
