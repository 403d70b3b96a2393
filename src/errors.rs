//! Error taxonomy for the admission pipeline.
//!
//! Every rejection at the boundary maps to a minimal, non-descriptive
//! response. Internal reasons live only in the event/log store.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced by the admission pipeline and admin API.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Soft rejection, retryable after the window resets.
    #[error("rate limited")]
    RateLimited { retry_after: Duration },

    /// Hard rejection, client must refetch a token.
    #[error("csrf validation failed")]
    CsrfInvalid,

    /// Identity is on a block list.
    #[error("identity blocked")]
    Blocked,

    /// Caller-fixable input problem (e.g., missing confirmation flag).
    #[error("validation failed: {0}")]
    Validation(String),

    /// No history for the requested identity.
    #[error("not found")]
    NotFound,

    /// Missing or invalid credentials for an admin action.
    #[error("unauthorized")]
    Unauthorized,

    /// Credentials valid but insufficient for the action.
    #[error("forbidden")]
    Forbidden,
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        match self {
            AdmissionError::RateLimited { retry_after } => {
                let mut response =
                    Response::new(Body::from("Too many requests, please try again later"));
                *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
                if let Ok(value) = retry_after.as_secs().max(1).to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            AdmissionError::CsrfInvalid => {
                (StatusCode::FORBIDDEN, "Invalid CSRF token").into_response()
            }
            AdmissionError::Blocked => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            AdmissionError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "Invalid request").into_response()
            }
            AdmissionError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AdmissionError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            AdmissionError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AdmissionError::RateLimited {
            retry_after: Duration::from_secs(42),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn validation_detail_is_not_leaked() {
        let response =
            AdmissionError::Validation("secret internal reason".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
