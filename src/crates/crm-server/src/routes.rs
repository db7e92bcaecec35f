//! The HTTP router (spec §6), grounded in the teacher's
//! `orchestrator::api::routes::create_router`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{agent, auth, interrupts, ops};
use crate::middleware::{cors_layer, logging_layer};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/start", get(auth::start))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/status", get(auth::status))
        .route("/api/orgs", get(auth::orgs))
        .route("/api/agent/execute", post(agent::execute))
        .route("/api/agent/approve", post(agent::approve))
        .route("/api/agent/resolve-contact", post(agent::resolve_contact))
        .route("/api/interrupts/poll", post(interrupts::poll))
        .route("/api/interrupts/acknowledge", post(interrupts::acknowledge))
        .route("/api/interrupts/approve", post(interrupts::approve))
        .route("/api/reset-conversation", post(ops::reset_conversation))
        .route("/health", get(ops::health))
        .route("/api/health/memory", get(ops::health_memory))
        .route("/api/metrics", get(ops::metrics))
        .layer(cors_layer())
        .layer(logging_layer())
        .with_state(state)
}
