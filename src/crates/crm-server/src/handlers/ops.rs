//! Reset and ops endpoints (spec §6): `/api/reset-conversation`, `/health`,
//! `/api/health/memory`, `/api/metrics`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crm_types::ThreadRef;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Deletes every checkpoint for the thread and clears whatever pending
/// interrupt/connection state the transport layer still holds for the
/// session, so the next turn on `session:org` starts a fresh lineage
/// (spec §8 scenario 6). This resets the Thread, not the Session or its
/// OAuth credential — those have independent lifecycles and are left alone.
pub async fn reset_conversation(State(state): State<AppState>, Json(req): Json<ResetRequest>) -> Response {
    let thread_id = req.thread_id.unwrap_or_else(|| ThreadRef::default_id(&req.session_id, req.org_id.as_deref().unwrap_or_default()));

    let checkpoints_deleted = state.checkpoints.delete_thread(&thread_id).await.is_ok();
    let interrupt_cleared = state.transport.registry.acknowledge(&req.session_id);
    state.transport.pool.disconnect(&req.session_id);

    (
        StatusCode::OK,
        Json(json!({
            "success": checkpoints_deleted,
            "deleted": { "checkpoints": checkpoints_deleted, "interrupt": interrupt_cleared },
        })),
    )
        .into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn health_memory(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "enabled": state.config.memory_api_key.is_some() }))
}

pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "use_v2_architecture": state.config.use_v2_architecture,
        "tracing_enabled": state.config.tracing_enabled,
    }))
}
