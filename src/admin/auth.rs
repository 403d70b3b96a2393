//! Admin API authentication.
//!
//! The gateway does not authenticate users itself; it trusts a verified
//! key tier as the role claim. Two bearer keys: the operator key covers
//! reads and block/unblock, the root key additionally allows destructive
//! clears.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AdmissionError;
use crate::monitor::event::{EventContext, SecurityEvent, SecurityEventKind};
use crate::pipeline::AdmissionState;

/// Role derived from the presented admin key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRole {
    Operator,
    Root,
}

/// Actor id taken from the `x-actor-id` header, recorded on audit trails.
#[derive(Debug, Clone)]
pub struct AdminActor(pub Option<String>);

pub async fn admin_auth_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AdmissionState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = state.config.load_full();

    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    let role = match auth_header {
        Some(value) if value == format!("Bearer {}", config.admin.root_key) => AdminRole::Root,
        Some(value) if value == format!("Bearer {}", config.admin.api_key) => AdminRole::Operator,
        _ => {
            state.monitor.report_event(SecurityEvent::new(
                SecurityEventKind::UnauthorizedAccess {
                    action: request.uri().path().to_string(),
                },
                EventContext {
                    ip: addr.ip().to_string(),
                    path: request.uri().path().to_string(),
                    method: request.method().to_string(),
                    ..EventContext::default()
                },
            ));
            return AdmissionError::Unauthorized.into_response();
        }
    };

    let actor = request
        .headers()
        .get("x-actor-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    request.extensions_mut().insert(role);
    request.extensions_mut().insert(AdminActor(actor));
    next.run(request).await
}
