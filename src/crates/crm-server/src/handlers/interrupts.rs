//! `/api/interrupts/*` handlers (spec §4.7, §6): pull-mode delivery of the
//! same interrupts push-mode clients get over the WebSocket.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crm_coordinator::TurnInput;
use crm_types::{ApprovalDecision, Decision};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PollRequest {
    pub session_id: String,
}

pub async fn poll(State(state): State<AppState>, Json(req): Json<PollRequest>) -> Json<Value> {
    match state.transport.registry.poll(&req.session_id) {
        Some(interrupt) => Json(json!({ "hasInterrupt": true, "interrupt": interrupt.payload })),
        None => Json(json!({ "hasInterrupt": false })),
    }
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub session_id: String,
}

pub async fn acknowledge(State(state): State<AppState>, Json(req): Json<AcknowledgeRequest>) -> Json<Value> {
    let success = state.transport.registry.acknowledge(&req.session_id);
    Json(json!({ "success": success }))
}

#[derive(Debug, Deserialize)]
pub struct ApproveInterruptRequest {
    pub session_id: String,
    pub approval_data: Value,
}

/// Pull-mode equivalent of `/api/agent/approve`: the decision arrives as
/// free-form `approval_data` rather than a typed body, since pull-mode
/// clients only know about the interrupt they polled, not the Coordinator's
/// `thread_id`/`org_id` bookkeeping — both are recovered from the pending
/// interrupt itself (spec §4.7 "this is a recovery aid, not the source of
/// truth — the checkpoint behind it is").
pub async fn approve(State(state): State<AppState>, Json(req): Json<ApproveInterruptRequest>) -> ApiResult<Json<Value>> {
    let Some(pending) = state.transport.registry.take(&req.session_id) else {
        return Ok(Json(json!({ "success": false, "result": Value::Null })));
    };

    let org_id = pending.thread_id.rsplit(':').next().unwrap_or_default().to_string();
    let decision: Decision =
        serde_json::from_value(req.approval_data.clone()).unwrap_or(Decision::Selection { value: req.approval_data });

    let mut decisions = HashMap::new();
    for r in &pending.payload.requests {
        decisions.insert(r.action_id.clone(), decision.clone());
    }

    let input = TurnInput {
        query: String::new(),
        session_id: req.session_id,
        org_id,
        timezone: "UTC".to_string(),
        thread_id: Some(pending.thread_id),
        user_id: None,
        approval_decision: Some(ApprovalDecision { decisions }),
    };

    let outcome = state.coordinator.run_turn(input).await?;
    let result = serde_json::to_value(&outcome).map_err(|e| crm_types::CrmError::Internal(e.to_string()))?;
    Ok(Json(json!({ "success": true, "result": result })))
}
