//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Construct the admission services from config
//! - Create the Axum router with the pipeline layered in order
//! - Apply config reloads to live services
//! - Run with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::{Extension, State},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::errors::AdmissionError;
use crate::monitor::event::{LogEntry, LogLevel};
use crate::monitor::{EventStore, SecurityMonitor};
use crate::pipeline::{admission_middleware, AdmissionState, AuthIdentity, ClientIp};
use crate::security::headers::hardening_headers_middleware;
use crate::security::{CsrfGuard, RateLimiter, SignatureDetector};

/// HTTP server for the admission gateway.
pub struct HttpServer {
    router: Router,
    state: AdmissionState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let store = Arc::new(EventStore::new(
            config.store.log_capacity,
            config.store.event_capacity,
        ));
        let monitor = Arc::new(SecurityMonitor::new(store, config.monitor.clone()));
        let detector = Arc::new(SignatureDetector::new(&config.detector));
        monitor.set_detection_rules(detector.rule_count());

        let state = AdmissionState {
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            csrf: Arc::new(CsrfGuard::new(config.csrf.clone())),
            detector,
            monitor,
            config: Arc::new(ArcSwap::from_pointee(config)),
        };

        let router = Self::build_router(&state);
        Self { router, state }
    }

    /// The shared admission state, for embedding and tests.
    pub fn state(&self) -> &AdmissionState {
        &self.state
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: &AdmissionState) -> Router {
        let config = state.config.load_full();

        // Business routes sit behind the full admission pipeline. The
        // admin API and health probe are internal surfaces with their own
        // gating.
        let business = Router::new()
            .route("/api/login", post(login_handler))
            .route("/api/echo", any(echo_handler))
            .route("/api/{*path}", any(echo_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                admission_middleware,
            ))
            .with_state(state.clone());

        Router::new()
            .route("/health", get(health_handler))
            .merge(business)
            .merge(setup_admin_router(state.clone()))
            .layer(middleware::from_fn(hardening_headers_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Apply config reloads to the live services.
        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                let current = reload_state.config.load_full();
                if new_config.listener.bind_address != current.listener.bind_address {
                    tracing::warn!(
                        "listener.bind_address changed; a restart is required for it to apply"
                    );
                }
                reload_state.limiter.apply_config(new_config.rate_limit.clone());
                reload_state.csrf.apply_config(new_config.csrf.clone());
                reload_state.monitor.apply_config(new_config.monitor.clone());
                reload_state.config.store(Arc::new(new_config));
                tracing::info!("Configuration reloaded");
            }
        });

        // Housekeeping: drop expired rate-limit records.
        let prune_state = self.state.clone();
        let mut prune_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = interval.tick() => prune_state.limiter.prune(),
                    _ = prune_shutdown.recv() => break,
                }
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for Ctrl+C or an internal shutdown trigger.
async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if result.is_ok() {
                tracing::info!("Shutdown signal received");
            }
        }
        _ = shutdown.recv() => {
            tracing::info!("Internal shutdown triggered");
        }
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Echo back the (sanitized) request body. Stands in for the downstream
/// business logic the pipeline forwards to.
async fn echo_handler(body: Option<Json<Value>>) -> Json<Value> {
    match body {
        Some(Json(value)) => Json(value),
        None => Json(json!({ "ok": true })),
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    #[serde(default)]
    password: String,
}

/// Demo login handler. Real deployments terminate authentication behind
/// the pipeline; this one exists to exercise the auth rate policy and
/// skip-on-success end to end.
async fn login_handler(
    State(state): State<AdmissionState>,
    auth_identity: Option<Extension<AuthIdentity>>,
    client_ip: Option<Extension<ClientIp>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    let ip = client_ip
        .map(|Extension(ClientIp(ip))| ip)
        .unwrap_or_default();

    if body.password == "demo-password" {
        // Successful authentication does not consume a rate-limit attempt.
        if let Some(Extension(AuthIdentity(identity))) = auth_identity {
            state.limiter.record_auth_success(&identity);
        }
        let session_id = Uuid::new_v4().to_string();
        let mut entry = LogEntry::new(LogLevel::Info, "auth", "login", "session opened")
            .with_user(body.email.clone());
        entry.session_id = Some(session_id.clone());
        state.monitor.store().push_log(entry);

        return Json(json!({ "status": "ok", "session_id": session_id })).into_response();
    }

    state.monitor.store().push_log(
        LogEntry::new(
            LogLevel::Warn,
            "auth",
            "login",
            format!("failed login from {}", ip),
        )
        .with_user(body.email.clone()),
    );
    AdmissionError::Unauthorized.into_response()
}
