//! Interrupt Transport (spec §4.7): carries a pending interrupt from the
//! Coordinator to the client and the decision back, exactly once per
//! session. Push mode (development) is a WebSocket per session with a
//! 30s heartbeat; pull mode (production) is poll/acknowledge/approve
//! against the same [`InterruptRegistry`].

pub mod pool;
pub mod registry;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

pub use pool::ConnectionPool;
pub use registry::{InterruptRegistry, INTERRUPT_TTL};

/// How often the background sweep runs. Independent of `INTERRUPT_TTL`
/// itself — this just needs to be frequent enough that nothing lingers
/// much past its TTL.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared transport state, held behind an `Arc` by both the push-mode
/// WebSocket handler and the pull-mode HTTP handlers in `crm-server`.
#[derive(Default)]
pub struct Transport {
    pub registry: InterruptRegistry,
    pub pool: ConnectionPool,
}

impl Transport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Publish an interrupt and, if a push-mode connection is live for this
    /// session, deliver it immediately; pull-mode clients pick it up on
    /// their next poll regardless.
    pub fn publish(
        &self,
        session_id: &str,
        thread_id: &str,
        interrupt_type: crm_types::InterruptType,
        payload: crm_types::InterruptPayload,
    ) {
        let interrupt = self.registry.publish(session_id, thread_id, interrupt_type, payload);
        if self.pool.is_connected(session_id) {
            if let Ok(json) = serde_json::to_string(&interrupt.payload) {
                self.pool.push(session_id, axum::extract::ws::Message::Text(json));
            }
        }
    }
}

/// Spawns the periodic sweep (spec §4.7 "a periodic sweep evicts interrupts
/// older than 5 minutes"). The returned handle is typically never awaited;
/// it runs for the lifetime of the process.
pub fn spawn_sweeper(transport: Arc<Transport>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = transport.registry.sweep_expired();
            if evicted > 0 {
                info!(evicted, "[TRANSPORT:SWEEP] evicted expired pending interrupts");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_types::{Domain, InterruptPayload, InterruptType};

    fn payload() -> InterruptPayload {
        InterruptPayload {
            interrupt_type: InterruptType::ApprovalRequired,
            previews: vec!["create a task".to_string()],
            message: "needs approval".to_string(),
            thread_id: "s1:org1".to_string(),
            domains: vec![Domain::Task],
            requests: vec![],
        }
    }

    #[test]
    fn publish_without_a_live_connection_is_still_recoverable_via_poll() {
        let transport = Transport::new();
        transport.publish("s1", "s1:org1", InterruptType::ApprovalRequired, payload());
        assert!(transport.registry.poll("s1").is_some());
    }

    #[tokio::test]
    async fn sweeper_runs_without_panicking() {
        let transport = Transport::new();
        let handle = spawn_sweeper(transport.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
    }
}
