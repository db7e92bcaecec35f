//! A small closed/open/half-open circuit breaker guarding the memory
//! service, in the `Arc<Mutex<State>>` idiom used by
//! `tooling::rate_limit::RateLimiter` — here tracking consecutive failures
//! instead of a token count.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            inner: Arc::new(Mutex::new(Inner { state: BreakerState::Closed, consecutive_failures: 0, opened_at: None })),
        }
    }

    /// Whether a call should be attempted right now. `Open` within the
    /// cooldown window refuses; past the cooldown it becomes `HalfOpen` and
    /// allows exactly one probe through.
    pub async fn allow(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                if inner.opened_at.map(|t| t.elapsed() >= self.cooldown).unwrap_or(false) {
                    inner.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;
        if inner.state == BreakerState::HalfOpen || inner.consecutive_failures >= self.failure_threshold {
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_the_failure_threshold_and_refuses_calls() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        assert!(breaker.allow().await);
        breaker.record_failure().await;
        assert!(breaker.allow().await);
        breaker.record_failure().await;
        assert!(!breaker.allow().await);
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure().await;
        assert!(!breaker.allow().await);
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(breaker.allow().await); // half-open probe
        breaker.record_failure().await;
        assert!(!breaker.allow().await);
    }

    #[tokio::test]
    async fn a_success_resets_the_breaker_fully() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        assert!(breaker.allow().await); // still below threshold after reset
    }
}
