//! Admin API handlers: monitoring queries, block commands, export, clear.

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AdmissionError;
use crate::monitor::analysis::{IpAnalysis, UserAnalysis};
use crate::monitor::engine::{BlockEntry, MonitoringStats};
use crate::monitor::event::{LogEntry, SecurityEvent};
use crate::monitor::store::{ClearTarget, EventFilter, ExportFormat, LogFilter};
use crate::pipeline::AdmissionState;

use super::auth::{AdminActor, AdminRole};

#[derive(Deserialize)]
pub struct BlockRequest {
    pub identifier: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct BlockResponse {
    pub identifier: String,
    pub blocked: bool,
    pub changed: bool,
}

#[derive(Serialize)]
pub struct BlockedLists {
    pub ips: Vec<BlockedIdentity>,
    pub users: Vec<BlockedIdentity>,
}

#[derive(Serialize)]
pub struct BlockedIdentity {
    pub identifier: String,
    #[serde(flatten)]
    pub entry: BlockEntry,
}

#[derive(Deserialize)]
pub struct ExportParams {
    pub format: ExportFormat,
    #[serde(default)]
    pub include_context: Option<bool>,
}

#[derive(Deserialize)]
pub struct ClearParams {
    pub target: ClearTarget,
    #[serde(default)]
    pub confirm: bool,
}

pub async fn get_stats(State(state): State<AdmissionState>) -> Json<MonitoringStats> {
    Json(state.monitor.stats())
}

pub async fn get_activity(
    State(state): State<AdmissionState>,
    Query(mut filter): Query<EventFilter>,
) -> Json<Vec<SecurityEvent>> {
    let default_limit = state.config.load().monitor.recent_events;
    filter.limit = Some(filter.limit.unwrap_or(default_limit));
    Json(state.monitor.store().query_events(&filter))
}

pub async fn get_logs(
    State(state): State<AdmissionState>,
    Query(mut filter): Query<LogFilter>,
) -> Json<Vec<LogEntry>> {
    let default_limit = state.config.load().monitor.recent_events;
    filter.limit = Some(filter.limit.unwrap_or(default_limit));
    Json(state.monitor.store().query_logs(&filter))
}

pub async fn get_blocked(State(state): State<AdmissionState>) -> Json<BlockedLists> {
    let (ips, users) = state.monitor.blocked_identities();
    let to_identity = |(identifier, entry): (String, BlockEntry)| BlockedIdentity {
        identifier,
        entry,
    };
    Json(BlockedLists {
        ips: ips.into_iter().map(to_identity).collect(),
        users: users.into_iter().map(to_identity).collect(),
    })
}

pub async fn get_ip_analysis(
    State(state): State<AdmissionState>,
    Path(ip): Path<String>,
) -> Result<Json<IpAnalysis>, AdmissionError> {
    state
        .monitor
        .get_ip_analysis(&ip)
        .map(Json)
        .ok_or(AdmissionError::NotFound)
}

pub async fn get_user_analysis(
    State(state): State<AdmissionState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserAnalysis>, AdmissionError> {
    state
        .monitor
        .get_user_analysis(&user_id)
        .map(Json)
        .ok_or(AdmissionError::NotFound)
}

pub async fn block_ip(
    State(state): State<AdmissionState>,
    Extension(actor): Extension<AdminActor>,
    Json(body): Json<BlockRequest>,
) -> Json<BlockResponse> {
    let reason = body.reason.unwrap_or_else(|| "manual block".to_string());
    let changed = state.monitor.block_ip(&body.identifier, &reason, actor.0);
    Json(BlockResponse {
        identifier: body.identifier,
        blocked: true,
        changed,
    })
}

pub async fn unblock_ip(
    State(state): State<AdmissionState>,
    Extension(actor): Extension<AdminActor>,
    Json(body): Json<BlockRequest>,
) -> Json<BlockResponse> {
    let changed = state.monitor.unblock_ip(&body.identifier, actor.0);
    Json(BlockResponse {
        identifier: body.identifier,
        blocked: false,
        changed,
    })
}

pub async fn block_user(
    State(state): State<AdmissionState>,
    Extension(actor): Extension<AdminActor>,
    Json(body): Json<BlockRequest>,
) -> Json<BlockResponse> {
    let reason = body.reason.unwrap_or_else(|| "manual block".to_string());
    let changed = state.monitor.block_user(&body.identifier, &reason, actor.0);
    Json(BlockResponse {
        identifier: body.identifier,
        blocked: true,
        changed,
    })
}

pub async fn unblock_user(
    State(state): State<AdmissionState>,
    Extension(actor): Extension<AdminActor>,
    Json(body): Json<BlockRequest>,
) -> Json<BlockResponse> {
    let changed = state.monitor.unblock_user(&body.identifier, actor.0);
    Json(BlockResponse {
        identifier: body.identifier,
        blocked: false,
        changed,
    })
}

pub async fn get_export(
    State(state): State<AdmissionState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AdmissionError> {
    let include_context = params.include_context.unwrap_or(true);
    let body = state
        .monitor
        .store()
        .export(params.format, include_context)?;
    let content_type = match params.format {
        ExportFormat::Json => "application/json",
        ExportFormat::Csv => "text/csv",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// Destructive clear. Restricted to the root key; requires an explicit
/// confirmation flag, never implied.
pub async fn delete_data(
    State(state): State<AdmissionState>,
    Extension(role): Extension<AdminRole>,
    Extension(actor): Extension<AdminActor>,
    Query(params): Query<ClearParams>,
) -> Result<StatusCode, AdmissionError> {
    if role != AdminRole::Root {
        return Err(AdmissionError::Forbidden);
    }
    state
        .monitor
        .clear_data(params.target, params.confirm, actor.0)?;
    Ok(StatusCode::NO_CONTENT)
}
