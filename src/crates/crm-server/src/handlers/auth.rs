//! `/auth/*` handlers (spec §6): the OAuth dance and its status poll.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub session_id: String,
}

/// Redirects to the provider's consent screen. `state` round-trips the
/// session id so `/auth/callback` knows which session to bind the
/// eventual token to, without needing server-side session storage here.
pub async fn start(State(state): State<AppState>, Query(q): Query<StartQuery>) -> Response {
    let url = format!(
        "{}/oauth/authorize?client_id={}&redirect_uri={}&state={}",
        state.config.base_url, state.config.client_id, state.config.redirect_uri, q.session_id,
    );
    Redirect::to(&url).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// The redirect back to the CRM happens immediately; the code-for-token
/// exchange continues in the background so the browser isn't kept waiting
/// on two network hops to a third party (spec §6 "token exchange continues
/// in background").
pub async fn callback(State(state): State<AppState>, Query(q): Query<CallbackQuery>) -> Response {
    let session_id = q.state.clone();
    let credentials = state.credentials.clone();
    let code = q.code.clone();
    tokio::spawn(async move {
        if let Err(err) = credentials.complete_oauth(&session_id, &code).await {
            tracing::warn!(session_id, error = %err, "[AUTH:CALLBACK] oauth exchange failed");
        }
    });

    Redirect::to(&state.config.base_url).into_response()
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub session_id: String,
}

pub async fn status(State(state): State<AppState>, Query(q): Query<StatusQuery>) -> Json<serde_json::Value> {
    match state.credentials.get_token(&q.session_id).await {
        Ok(Some(_)) => Json(json!({ "ok": true })),
        Ok(None) => Json(json!({ "ok": false, "requiresReauth": true })),
        Err(_) => Json(json!({ "ok": false, "requiresReauth": true, "expired": true })),
    }
}

pub async fn orgs(State(state): State<AppState>, Query(q): Query<StatusQuery>) -> Response {
    match state.credentials.get_token(&q.session_id).await {
        Ok(Some(token)) => {
            let client = reqwest::Client::new();
            let url = format!("{}/organizations", state.config.base_url);
            match client.post(&url).json(&json!({ "token": token })).send().await {
                Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await {
                    Ok(body) => (StatusCode::OK, Json(json!({ "Organizations": body }))).into_response(),
                    Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "INTERNAL_ERROR" }))).into_response(),
                },
                _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "INTERNAL_ERROR" }))).into_response(),
            }
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "requiresReauth": true }))).into_response(),
    }
}
