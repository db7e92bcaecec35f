//! API error envelope (spec §7), grounded in the teacher's
//! `orchestrator::api::error::{ApiError, ApiErrorResponse}` shape and
//! narrowed to the status codes this spec actually names.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crm_types::CrmError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Wraps [`CrmError`] plus the couple of HTTP-only conditions (rate limiting,
/// bad JSON) that never reach the Coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Turn(#[from] CrmError),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("malformed request body: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requiresReauth")]
    requires_reauth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requiresRestart")]
    requires_restart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "retryAfter")]
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Turn(CrmError::Input(_)) => StatusCode::BAD_REQUEST,
            ApiError::Turn(CrmError::AuthRequired) => StatusCode::UNAUTHORIZED,
            ApiError::Turn(CrmError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Turn(CrmError::SessionUnrecoverable(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Turn(CrmError::Domain { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Turn(CrmError::Planner(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Turn(CrmError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Turn(CrmError::Input(_)) => "INPUT_ERROR",
            ApiError::Turn(CrmError::AuthRequired) => "AUTH_REQUIRED",
            ApiError::Turn(CrmError::RateLimited { .. }) => "RATE_LIMITED",
            ApiError::Turn(CrmError::SessionUnrecoverable(_)) => "SESSION_UNRECOVERABLE",
            ApiError::Turn(CrmError::Domain { .. }) => "DOMAIN_ERROR",
            ApiError::Turn(CrmError::Planner(_)) => "PLANNER_ERROR",
            ApiError::Turn(CrmError::Internal(_)) => "INTERNAL_ERROR",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.error_type().to_string(),
            message: self.to_string(),
            requires_reauth: matches!(self, ApiError::Turn(CrmError::AuthRequired)).then_some(true),
            requires_restart: matches!(self, ApiError::Turn(CrmError::SessionUnrecoverable(_))).then_some(true),
            retry_after: match &self {
                ApiError::Turn(CrmError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
                ApiError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
                _ => None,
            },
        };

        tracing::error!(status = %status, error = %self, "[API:ERROR] request failed");
        (status, Json(body)).into_response()
    }
}

/// `TurnOutcome::RequiresReauth` serializes to just `{"status":"REQUIRES_REAUTH"}`
/// under its tagged enum — this merges in the `requiresReauth` flag the spec's
/// 401 response shape promises (spec §6).
pub fn with_requires_reauth(value: Value) -> Value {
    let mut value = value;
    if let Value::Object(map) = &mut value {
        map.insert("requiresReauth".to_string(), json!(true));
    }
    value
}
