//! Hardening response headers.
//!
//! Applied by the outermost layer so every response carries them, rejected
//! requests included.

use axum::body::Body;
use axum::http::{header::HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

const HARDENING_HEADERS: &[(&str, &str)] = &[
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
];

/// Middleware that unconditionally sets the hardening headers on the
/// response, before any other layer can short-circuit.
pub async fn hardening_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in HARDENING_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}
