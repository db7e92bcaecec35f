//! Pending-interrupt registry (spec §4.7): at most one pending interrupt per
//! session, replacing rather than queuing. Grounded in the teacher's
//! `orchestrator::api::ws::rate_limit::RateLimiter` idiom of a `DashMap`
//! keyed per-client guarding small per-client state.

use chrono::{Duration, Utc};
use dashmap::DashMap;

use crm_types::{InterruptPayload, InterruptType, PendingInterrupt};

/// Interrupts older than this are evicted by the periodic sweep (spec §4.7).
pub const INTERRUPT_TTL: Duration = Duration::minutes(5);

#[derive(Default)]
pub struct InterruptRegistry {
    pending: DashMap<String, PendingInterrupt>,
}

impl InterruptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new interrupt for `session_id`. Any interrupt already pending
    /// for this session is replaced, per the "newer ones replace older"
    /// invariant.
    pub fn publish(&self, session_id: &str, thread_id: &str, interrupt_type: InterruptType, payload: InterruptPayload) -> PendingInterrupt {
        let interrupt = PendingInterrupt {
            session_id: session_id.to_string(),
            thread_id: thread_id.to_string(),
            interrupt_type,
            payload,
            created_at: Utc::now(),
        };
        self.pending.insert(session_id.to_string(), interrupt.clone());
        interrupt
    }

    /// `poll`: the pending interrupt for this session, if any and not yet expired.
    pub fn poll(&self, session_id: &str) -> Option<PendingInterrupt> {
        let entry = self.pending.get(session_id)?;
        if entry.is_expired(Utc::now(), INTERRUPT_TTL) {
            drop(entry);
            self.pending.remove(session_id);
            return None;
        }
        Some(entry.clone())
    }

    /// `acknowledge`: clear the pending interrupt once the client has shown it.
    /// Returns whether something was actually cleared.
    pub fn acknowledge(&self, session_id: &str) -> bool {
        self.pending.remove(session_id).is_some()
    }

    /// `approve`/resume path: take and remove the pending interrupt so a
    /// stale decision can't be replayed against it twice.
    pub fn take(&self, session_id: &str) -> Option<PendingInterrupt> {
        self.pending.remove(session_id).map(|(_, v)| v)
    }

    pub fn has_pending(&self, session_id: &str) -> bool {
        self.poll(session_id).is_some()
    }

    /// Evict everything older than [`INTERRUPT_TTL`]. Run periodically from
    /// a background task (spec §4.7 "periodic sweep").
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> =
            self.pending.iter().filter(|entry| entry.is_expired(now, INTERRUPT_TTL)).map(|entry| entry.key().clone()).collect();
        for session_id in &expired {
            self.pending.remove(session_id);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_types::Domain;

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
    fn publishing_replaces_an_existing_pending_interrupt() {
        let registry = InterruptRegistry::new();
        registry.publish("s1", "s1:org1", InterruptType::ApprovalRequired, payload());
        registry.publish("s1", "s1:org1", InterruptType::ContactDisambiguation, payload());

        let polled = registry.poll("s1").unwrap();
        assert_eq!(polled.interrupt_type, InterruptType::ContactDisambiguation);
    }

    #[test]
    fn acknowledge_clears_the_entry() {
        let registry = InterruptRegistry::new();
        registry.publish("s1", "s1:org1", InterruptType::ApprovalRequired, payload());
        assert!(registry.acknowledge("s1"));
        assert!(registry.poll("s1").is_none());
    }

    #[test]
    fn expired_interrupts_are_not_returned_by_poll() {
        let registry = InterruptRegistry::new();
        let mut interrupt = registry.publish("s1", "s1:org1", InterruptType::ApprovalRequired, payload());
        interrupt.created_at = Utc::now() - Duration::minutes(6);
        registry.pending.insert("s1".to_string(), interrupt);

        assert!(registry.poll("s1").is_none());
    }

    #[test]
    fn sweep_evicts_only_expired_entries() {
        let registry = InterruptRegistry::new();
        registry.publish("fresh", "fresh:org1", InterruptType::ApprovalRequired, payload());

        let mut stale = registry.publish("stale", "stale:org1", InterruptType::ApprovalRequired, payload());
        stale.created_at = Utc::now() - Duration::minutes(10);
        registry.pending.insert("stale".to_string(), stale);

        assert_eq!(registry.sweep_expired(), 1);
        assert!(registry.poll("fresh").is_some());
        assert!(registry.pending.get("stale").is_none());
    }
}
