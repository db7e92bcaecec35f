//! Exponential backoff for idempotent reads only (spec §4.3), grounded on
//! the teacher's `orca::executor::retry` idiom (`RetryConfig` + `with_retry`)
//! but with the retry predicate narrowed to what the CRM tool layer is
//! allowed to retry.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crm_types::ErrorClass;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    /// `initial=1s, factor=2, max=10s, attempts=3` (spec §4.3).
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: usize) -> Duration {
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Network/5xx/expired-token responses are transient enough to retry on a
/// *read*. This is narrower than [`ErrorClass::is_retryable`], which backs
/// general user-facing classification, not the tool layer's retry policy —
/// reads additionally retry `Authentication`, since an "expired token" read
/// failure is expected to self-resolve on the CRM side within the backoff
/// window, unlike a hard authorization failure.
pub fn retryable_for_reads(class: ErrorClass) -> bool {
    matches!(class, ErrorClass::Network | ErrorClass::ServerError | ErrorClass::Timeout | ErrorClass::Authentication)
}

pub async fn with_retry<F, Fut, T>(config: &RetryConfig, label: &str, mut operation: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = (T, bool)>,
{
    let mut attempt = 0;
    loop {
        let (result, should_retry) = operation().await;
        if !should_retry || attempt >= config.max_retries {
            return result;
        }
        let delay = config.delay_for(attempt);
        debug!(label, attempt, delay_ms = delay.as_millis() as u64, "[DOMAIN_TOOLS:RETRY] retrying read");
        sleep(delay).await;
        attempt += 1;
    }
}
