//! Per-session rate limiting (spec §5 "10 queries per minute per session,
//! sliding window, periodic 1%-sampled cleanup"). Combines the teacher's
//! `orchestrator::api::ws::rate_limit::RateLimiter` idiom of a `DashMap`
//! keyed per-client with `tooling::rate_limit::SlidingWindowLimiter` as the
//! actual counting primitive.

use dashmap::DashMap;
use rand::Rng;
use std::time::Duration;

use tooling::rate_limit::SlidingWindowLimiter;

const MAX_QUERIES_PER_MINUTE: usize = 10;
const WINDOW: Duration = Duration::from_secs(60);

/// Cleanup runs on roughly 1% of requests rather than on a timer, since the
/// entry count tracks active sessions and this needs no background task.
const CLEANUP_SAMPLE_RATE: f64 = 0.01;

pub struct SessionRateLimiter {
    sessions: DashMap<String, SlidingWindowLimiter>,
}

impl Default for SessionRateLimiter {
    fn default() -> Self {
        Self { sessions: DashMap::new() }
    }
}

impl SessionRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if this session is still under the limit (and the call counts
    /// against it); `false` if it should be rejected with 429.
    pub async fn check(&self, session_id: &str) -> bool {
        let allowed = if let Some(limiter) = self.sessions.get(session_id) {
            limiter.check().await
        } else {
            let limiter = SlidingWindowLimiter::new(MAX_QUERIES_PER_MINUTE, WINDOW);
            let allowed = limiter.check().await;
            self.sessions.insert(session_id.to_string(), limiter);
            allowed
        };

        self.maybe_cleanup().await;
        allowed
    }

    async fn maybe_cleanup(&self) {
        if !rand::thread_rng().gen_bool(CLEANUP_SAMPLE_RATE) {
            return;
        }
        let mut stale = Vec::new();
        for entry in self.sessions.iter() {
            if entry.value().count().await == 0 {
                stale.push(entry.key().clone());
            }
        }
        for session_id in stale {
            self.sessions.remove(&session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_configured_limit() {
        let limiter = SessionRateLimiter::new();
        for _ in 0..MAX_QUERIES_PER_MINUTE {
            assert!(limiter.check("s1").await);
        }
        assert!(!limiter.check("s1").await);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let limiter = SessionRateLimiter::new();
        for _ in 0..MAX_QUERIES_PER_MINUTE {
            assert!(limiter.check("s1").await);
        }
        assert!(limiter.check("s2").await);
    }
}
