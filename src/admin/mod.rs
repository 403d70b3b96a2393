pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::pipeline::AdmissionState;

pub fn setup_admin_router(state: AdmissionState) -> Router {
    Router::new()
        .route("/admin/stats", get(get_stats))
        .route("/admin/activity", get(get_activity))
        .route("/admin/logs", get(get_logs))
        .route("/admin/blocked", get(get_blocked))
        .route("/admin/analysis/ip/{ip}", get(get_ip_analysis))
        .route("/admin/analysis/user/{user_id}", get(get_user_analysis))
        .route("/admin/block/ip", post(block_ip))
        .route("/admin/unblock/ip", post(unblock_ip))
        .route("/admin/block/user", post(block_user))
        .route("/admin/unblock/user", post(unblock_user))
        .route("/admin/export", get(get_export))
        .route("/admin/data", delete(delete_data))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
