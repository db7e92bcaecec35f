//! Push-mode connection pool (spec §4.7): one live channel per session,
//! newer connections supersede older ones. Grounded in the teacher's
//! `orchestrator::api::ws::pool::ConnectionPool`, narrowed from an
//! arbitrary-capacity pool keyed by a generated client id to exactly one
//! slot per session id.

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

pub type Outbox = mpsc::UnboundedSender<Message>;

/// Live push-mode connections, one per session.
#[derive(Default)]
pub struct ConnectionPool {
    connections: DashMap<String, Outbox>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `session_id`. If one already exists it
    /// is dropped (its send end closes, which the prior connection's write
    /// loop observes as a closed channel and exits on) — this is the
    /// "supersede previous connections for the same session" invariant.
    pub fn connect(&self, session_id: &str, outbox: Outbox) {
        self.connections.insert(session_id.to_string(), outbox);
    }

    pub fn disconnect(&self, session_id: &str) {
        self.connections.remove(session_id);
    }

    /// Push a message to the live connection for `session_id`, if any.
    /// Silently drops the stale entry if the receiver has already gone away.
    pub fn push(&self, session_id: &str, message: Message) -> bool {
        match self.connections.get(session_id) {
            Some(outbox) => outbox.send(message).is_ok(),
            None => false,
        }
    }

    pub fn is_connected(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }
}

pub type SharedConnectionPool = Arc<ConnectionPool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_twice_supersedes_the_first_channel() {
        let pool = ConnectionPool::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        pool.connect("s1", tx1);
        pool.connect("s1", tx2);

        assert!(pool.push("s1", Message::Text("hi".to_string())));
        assert!(rx2.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn pushing_to_an_unknown_session_is_a_no_op() {
        let pool = ConnectionPool::new();
        assert!(!pool.push("ghost", Message::Text("hi".to_string())));
    }

    #[test]
    fn disconnect_removes_the_entry() {
        let pool = ConnectionPool::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        pool.connect("s1", tx);
        assert!(pool.is_connected("s1"));
        pool.disconnect("s1");
        assert!(!pool.is_connected("s1"));
    }
}
