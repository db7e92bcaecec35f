//! Memory Context client (SPEC_FULL §4.8). Best-effort recall/synthesis
//! with a timeout and circuit breaker; never blocks or fails the turn.
//! Storage internals are out of scope — this crate is the interface
//! boundary only, consumed by `crm-coordinator`'s `recall_memory` node.

mod circuit;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crm_types::{MemoryContext, MemoryItem};

use circuit::CircuitBreaker;

const RECALL_TIMEOUT: Duration = Duration::from_secs(2);
const SYNTHESIZE_TIMEOUT: Duration = Duration::from_secs(3);
const FAILURE_THRESHOLD: u32 = 3;
const COOLDOWN: Duration = Duration::from_secs(30);

#[async_trait]
pub trait MemoryClient: Send + Sync {
    /// Best-effort recall; an empty context on any failure, never an error.
    async fn recall(&self, query: &str, thread_id: &str) -> MemoryContext;

    /// Fire-and-best-effort synthesis of the turn's message log. Failures
    /// are logged, never surfaced to the caller.
    async fn synthesize(&self, thread_id: &str, messages: &[String]);
}

/// Used when `MEMORY_API_KEY` is absent (spec §6) — memory is simply not
/// consulted.
pub struct NullMemoryClient;

#[async_trait]
impl MemoryClient for NullMemoryClient {
    async fn recall(&self, _query: &str, _thread_id: &str) -> MemoryContext {
        MemoryContext::empty()
    }

    async fn synthesize(&self, _thread_id: &str, _messages: &[String]) {}
}

/// Talks to the real memory service over `reqwest`, guarded by a timeout
/// and a consecutive-failure circuit breaker.
pub struct HttpMemoryClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    breaker: CircuitBreaker,
}

impl HttpMemoryClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            breaker: CircuitBreaker::new(FAILURE_THRESHOLD, COOLDOWN),
        }
    }
}

#[async_trait]
impl MemoryClient for HttpMemoryClient {
    async fn recall(&self, query: &str, thread_id: &str) -> MemoryContext {
        if !self.breaker.allow().await {
            return MemoryContext::empty();
        }

        let request = self
            .http
            .post(format!("{}/recall", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "query": query, "thread_id": thread_id }));

        let outcome = tokio::time::timeout(RECALL_TIMEOUT, request.send()).await;
        match outcome {
            Ok(Ok(response)) if response.status().is_success() => match response.json::<Vec<MemoryItem>>().await {
                Ok(items) => {
                    self.breaker.record_success().await;
                    MemoryContext { items }
                }
                Err(err) => {
                    warn!(thread_id, error = %err, "[MEMORY:RECALL] response decode failed");
                    self.breaker.record_failure().await;
                    MemoryContext::empty()
                }
            },
            Ok(Ok(response)) => {
                warn!(thread_id, status = response.status().as_u16(), "[MEMORY:RECALL] non-success response");
                self.breaker.record_failure().await;
                MemoryContext::empty()
            }
            Ok(Err(err)) => {
                warn!(thread_id, error = %err, "[MEMORY:RECALL] transport error");
                self.breaker.record_failure().await;
                MemoryContext::empty()
            }
            Err(_) => {
                warn!(thread_id, "[MEMORY:RECALL] timed out");
                self.breaker.record_failure().await;
                MemoryContext::empty()
            }
        }
    }

    async fn synthesize(&self, thread_id: &str, messages: &[String]) {
        if !self.breaker.allow().await {
            return;
        }

        let request = self
            .http
            .post(format!("{}/synthesize", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "thread_id": thread_id, "messages": messages }));

        match tokio::time::timeout(SYNTHESIZE_TIMEOUT, request.send()).await {
            Ok(Ok(response)) if response.status().is_success() => self.breaker.record_success().await,
            Ok(Ok(response)) => {
                warn!(thread_id, status = response.status().as_u16(), "[MEMORY:SYNTHESIZE] non-success response");
                self.breaker.record_failure().await;
            }
            Ok(Err(err)) => {
                warn!(thread_id, error = %err, "[MEMORY:SYNTHESIZE] transport error");
                self.breaker.record_failure().await;
            }
            Err(_) => {
                warn!(thread_id, "[MEMORY:SYNTHESIZE] timed out");
                self.breaker.record_failure().await;
            }
        }
    }
}
