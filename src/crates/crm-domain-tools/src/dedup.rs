//! Per-turn mutation fingerprinting (spec §4.3): identical `{endpoint,
//! payload}` pairs within a 5-minute window short-circuit to the prior
//! result instead of hitting the network again.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crm_types::Envelope;

pub const DEDUP_WINDOW: Duration = Duration::from_secs(5 * 60);

pub struct MutationDedup {
    window: Duration,
    entries: DashMap<String, (Instant, Envelope)>,
}

impl MutationDedup {
    pub fn new(window: Duration) -> Self {
        Self { window, entries: DashMap::new() }
    }

    /// `payload` must already exclude credentials (token/org id) — callers
    /// fingerprint on the request body only. `serde_json::Value`'s default
    /// map is key-sorted, so identical payloads serialize identically
    /// regardless of construction order.
    pub fn fingerprint(endpoint: &str, payload: &serde_json::Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update(b"\0");
        hasher.update(payload.to_string().as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn get(&self, fingerprint: &str) -> Option<Envelope> {
        let entry = self.entries.get(fingerprint)?;
        let (seen_at, envelope) = entry.value();
        if seen_at.elapsed() < self.window {
            Some(envelope.clone())
        } else {
            None
        }
    }

    pub fn put(&self, fingerprint: String, envelope: Envelope) {
        self.entries.insert(fingerprint, (Instant::now(), envelope));
    }
}

impl Default for MutationDedup {
    fn default() -> Self {
        Self::new(DEDUP_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_payloads_fingerprint_identically_regardless_of_key_order() {
        let a = serde_json::json!({"b": 2, "a": 1});
        let b = serde_json::json!({"a": 1, "b": 2});
        assert_eq!(MutationDedup::fingerprint("/tasks", &a), MutationDedup::fingerprint("/tasks", &b));
    }

    #[test]
    fn different_endpoints_fingerprint_differently_for_the_same_payload() {
        let p = serde_json::json!({"a": 1});
        assert_ne!(MutationDedup::fingerprint("/tasks", &p), MutationDedup::fingerprint("/calendar", &p));
    }

    #[test]
    fn dedup_cache_short_circuits_within_the_window_and_expires_after() {
        let dedup = MutationDedup::new(Duration::from_millis(20));
        let fp = MutationDedup::fingerprint("/tasks", &serde_json::json!({"a": 1}));
        assert!(dedup.get(&fp).is_none());
        dedup.put(fp.clone(), Envelope::ok(serde_json::json!({"id": 1})));
        assert!(dedup.get(&fp).is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(dedup.get(&fp).is_none());
    }
}
