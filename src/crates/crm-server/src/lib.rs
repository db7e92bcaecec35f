//! HTTP API binding the Coordinator graph to the outside world (spec §6).
//!
//! Wires together every crate the Coordinator depends on — credentials,
//! memory, checkpoints, the domain subgraphs, the interrupt transport — into
//! one `axum::Router`, the way the teacher's `orchestrator-server` binary
//! wires `DatabaseConnection` + `BroadcastState` into `create_router`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod state;

use std::sync::Arc;

use langgraph_checkpoint::{CheckpointSaver, InMemoryCheckpointSaver, SqliteCheckpointSaver};
use langgraph_core::llm::ChatModel;

use crm_credentials::backend::HttpOAuthBackend;
use crm_credentials::CredentialStore;
use crm_domain_tools::CrmClient;
use crm_memory::{HttpMemoryClient, MemoryClient, NullMemoryClient};
use crm_transport::Transport;

use config::ServerConfig;
use rate_limit::SessionRateLimiter;
use state::AppState;

/// Build every long-lived service the Coordinator needs and assemble the
/// router. Split out from `main` so tests can build an `AppState` against
/// an in-memory checkpoint store without binding a socket.
pub async fn build_app_state(config: ServerConfig) -> anyhow::Result<AppState> {
    let http_client = reqwest::Client::builder().build()?;
    let backend = HttpOAuthBackend::new(
        http_client,
        config.oauth_exchange_url(),
        config.token_exchange_url(),
        config.refresh_url(),
        chrono::Duration::hours(1),
    );
    let credentials = Arc::new(CredentialStore::new(backend));

    let memory: Arc<dyn MemoryClient> = match &config.memory_api_key {
        Some(key) => Arc::new(HttpMemoryClient::new(config.base_url.clone(), key.clone())),
        None => Arc::new(NullMemoryClient),
    };

    let checkpoints: Arc<dyn CheckpointSaver> = match &config.checkpoint_db_url {
        Some(url) => Arc::new(SqliteCheckpointSaver::connect(url).await?),
        None => {
            tracing::warn!("[SERVER:STARTUP] CHECKPOINT_DB_URL not set, using an in-memory checkpoint store");
            Arc::new(InMemoryCheckpointSaver::new())
        }
    };

    let crm_client = Arc::new(CrmClient::new(config.base_url.clone())?);

    let llm: Option<Arc<dyn ChatModel>> = config.openai_api_key.clone().map(|api_key| {
        let llm_config = llm::config::RemoteLlmConfig::new(api_key, "https://api.openai.com/v1", "gpt-4o-mini");
        Arc::new(llm::remote::openai::OpenAiClient::new(llm_config)) as Arc<dyn ChatModel>
    });

    let subgraphs = crm_coordinator::Subgraphs {
        contact: crm_subgraphs::compiled_contact(crm_client.clone(), llm)?,
        calendar: crm_subgraphs::compiled_calendar(crm_client.clone())?,
        task: crm_subgraphs::compiled_task(crm_client.clone())?,
        workflow: crm_subgraphs::compiled_workflow(crm_client)?,
    };

    let transport = Transport::new();
    crm_transport::spawn_sweeper(transport.clone());

    let coordinator = Arc::new(crm_coordinator::Coordinator::new(credentials.clone(), memory, checkpoints.clone(), subgraphs, transport.clone()));

    Ok(AppState {
        coordinator,
        credentials,
        checkpoints,
        transport,
        rate_limiter: Arc::new(SessionRateLimiter::new()),
        config: Arc::new(config),
    })
}
