//! Shared application state (spec §6), grounded in the teacher's
//! `orchestrator::api::routes::AppState` — a `Clone`able bundle of `Arc`s
//! handed to every handler via `Router::with_state`.

use std::sync::Arc;

use crm_credentials::backend::HttpOAuthBackend;
use crm_credentials::CredentialStore;
use crm_transport::Transport;

use crate::config::ServerConfig;
use crate::rate_limit::SessionRateLimiter;

pub type AppCoordinator = crm_coordinator::Coordinator<HttpOAuthBackend>;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<AppCoordinator>,
    pub credentials: Arc<CredentialStore<HttpOAuthBackend>>,
    pub checkpoints: Arc<dyn langgraph_checkpoint::CheckpointSaver>,
    pub transport: Arc<Transport>,
    pub rate_limiter: Arc<SessionRateLimiter>,
    pub config: Arc<ServerConfig>,
}
