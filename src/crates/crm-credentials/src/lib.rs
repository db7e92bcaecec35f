//! Credential Store & Refresher (spec §4.1).
//!
//! Mirrors the teacher workspace's `tooling::rate_limit::RateLimiter`
//! idiom of an `Arc<Mutex<State>>` guarding a tiny state machine, but here
//! the mutex itself *is* the single-flight gate: holding a session's lock
//! across the `await` of a refresh call means a second caller that blocks
//! on the same lock observes the already-refreshed token and never issues
//! a second network call.

pub mod backend;
mod error;
mod store;

pub use backend::OAuthBackend;
pub use error::{CredentialError, Result};
pub use store::CredentialStore;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBackend {
        calls: Arc<AtomicUsize>,
        ttl: Duration,
    }

    #[async_trait]
    impl OAuthBackend for CountingBackend {
        async fn exchange_code(&self, _code: &str) -> Result<(String, chrono::DateTime<Utc>)> {
            Ok(("tok-0".to_string(), Utc::now() + self.ttl))
        }

        async fn refresh(&self, current_token: &str) -> Result<(String, chrono::DateTime<Utc>)> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            // tiny delay so concurrent callers actually overlap
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok((format!("{current_token}-r{n}"), Utc::now() + self.ttl))
        }
    }

    #[tokio::test]
    async fn concurrent_get_token_triggers_exactly_one_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend { calls: calls.clone(), ttl: Duration::minutes(1) };
        let store = Arc::new(CredentialStore::new(backend));
        store.complete_oauth("sess-1", "one-time-code").await.unwrap();

        // Force the stored token into "needs refresh" territory by completing
        // OAuth with a TTL under the 5-minute threshold, then fire two
        // concurrent get_token calls.
        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.get_token("sess-1").await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.get_token("sess-1").await })
        };
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.unwrap().unwrap().is_some());
        assert!(rb.unwrap().unwrap().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_session_returns_none() {
        let backend = CountingBackend { calls: Arc::new(AtomicUsize::new(0)), ttl: Duration::hours(1) };
        let store = CredentialStore::new(backend);
        assert!(store.get_token("never-seen").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_the_stored_token_for_one_final_attempt() {
        struct FlakyBackend;
        #[async_trait]
        impl OAuthBackend for FlakyBackend {
            async fn exchange_code(&self, _code: &str) -> Result<(String, chrono::DateTime<Utc>)> {
                Ok(("tok".to_string(), Utc::now() + Duration::minutes(1)))
            }
            async fn refresh(&self, _current_token: &str) -> Result<(String, chrono::DateTime<Utc>)> {
                Err(CredentialError::RefreshFailed("network error".into()))
            }
        }
        let store = CredentialStore::new(FlakyBackend);
        store.complete_oauth("sess-1", "code").await.unwrap();
        // Token is within the refresh threshold but not yet expired: the
        // failed refresh must not erase it.
        let token = store.get_token("sess-1").await.unwrap();
        assert_eq!(token.as_deref(), Some("tok"));
    }
}
