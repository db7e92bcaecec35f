//! `/api/agent/*` handlers (spec §6): execute, approve, resolve-contact.
//! All three funnel into [`crm_coordinator::Coordinator::run_turn`] — the
//! only difference between them is how the request body is shaped into a
//! [`TurnInput`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crm_coordinator::{TurnInput, TurnOutcome};
use crm_types::{ApprovalDecision, Decision};

use crate::error::{with_requires_reauth, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub query: String,
    pub session_id: String,
    pub org_id: String,
    #[serde(default, rename = "time_zone")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub session_id: String,
    pub org_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub approvals: Option<std::collections::HashMap<String, Decision>>,
    /// V2 shorthand: a single decision applied to every pending request.
    #[serde(default)]
    pub decision: Option<Decision>,
    #[serde(default)]
    pub contact_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveContactRequest {
    pub session_id: String,
    pub org_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub contact_data: Option<Value>,
}

pub async fn execute(State(state): State<AppState>, Json(req): Json<ExecuteRequest>) -> ApiResult<Response> {
    if !state.rate_limiter.check(&req.session_id).await {
        return Err(ApiError::RateLimited { retry_after_secs: 60 });
    }

    let input = TurnInput {
        query: req.query,
        session_id: req.session_id,
        org_id: req.org_id,
        timezone: req.timezone.unwrap_or_else(|| "UTC".to_string()),
        thread_id: req.thread_id,
        user_id: None,
        approval_decision: None,
    };

    run_turn(&state, input).await
}

pub async fn approve(State(state): State<AppState>, Json(req): Json<ApproveRequest>) -> ApiResult<Response> {
    if !state.rate_limiter.check(&req.session_id).await {
        return Err(ApiError::RateLimited { retry_after_secs: 60 });
    }

    let approval_decision = match (req.approvals, req.decision, req.contact_id) {
        (Some(approvals), _, _) => ApprovalDecision { decisions: approvals },
        (None, Some(decision), _) => single_decision(decision),
        (None, None, Some(contact_id)) => single_decision(Decision::Selection { value: Value::String(contact_id) }),
        (None, None, None) => return Err(ApiError::BadRequest("approve requires approvals, decision, or contact_id".to_string())),
    };

    let input = TurnInput {
        query: String::new(),
        session_id: req.session_id,
        org_id: req.org_id,
        timezone: "UTC".to_string(),
        thread_id: Some(req.thread_id),
        user_id: None,
        approval_decision: Some(approval_decision),
    };

    run_turn(&state, input).await
}

pub async fn resolve_contact(State(state): State<AppState>, Json(req): Json<ResolveContactRequest>) -> ApiResult<Response> {
    if !state.rate_limiter.check(&req.session_id).await {
        return Err(ApiError::RateLimited { retry_after_secs: 60 });
    }

    let selection = req
        .contact_id
        .map(Value::String)
        .or(req.contact_data)
        .ok_or_else(|| ApiError::BadRequest("resolve-contact requires contact_id or contact_data".to_string()))?;

    let input = TurnInput {
        query: String::new(),
        session_id: req.session_id,
        org_id: req.org_id,
        timezone: "UTC".to_string(),
        thread_id: Some(req.thread_id),
        user_id: None,
        approval_decision: Some(single_decision(Decision::Selection { value: selection })),
    };

    run_turn(&state, input).await
}

/// A single decision that applies to whatever was pending, keyed under the
/// placeholder id `"_"` — the Coordinator rewrites this to the real
/// `action_id` when exactly one request is outstanding and rejects it
/// otherwise, so a V2 caller that doesn't know the exact id can still
/// unblock a single-request interrupt without bypassing the coverage check.
fn single_decision(decision: Decision) -> ApprovalDecision {
    ApprovalDecision::single("_", decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_decision_keys_under_a_placeholder_action_id() {
        let decision = single_decision(Decision::Approve);
        assert!(decision.decisions.contains_key("_"));
    }
}

async fn run_turn(state: &AppState, input: TurnInput) -> ApiResult<Response> {
    let outcome = state.coordinator.run_turn(input).await?;
    let status = match &outcome {
        TurnOutcome::Completed { .. } => StatusCode::OK,
        TurnOutcome::PendingApproval { .. } => StatusCode::ACCEPTED,
        TurnOutcome::RequiresReauth => StatusCode::UNAUTHORIZED,
        TurnOutcome::Failed { .. } => StatusCode::OK,
    };

    let body = serde_json::to_value(&outcome).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let body = if matches!(outcome, TurnOutcome::RequiresReauth) { with_requires_reauth(body) } else { body };

    Ok((status, Json(body)).into_response())
}
