//! Retry with exponential backoff for transient API failures
//!
//! Only network errors, timeouts, HTTP 429, and 5xx responses are retried;
//! other client errors and decode failures propagate immediately.

use crate::api::{ApiError, ApiResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry policy for a single logical API operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,

    /// Base delay doubled on each attempt
    pub base_delay_ms: u64,

    /// Ceiling on any single backoff delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff for the given zero-based attempt: `min(base * 2^attempt + jitter, max)`
    fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(20));
        let jitter = rand::thread_rng().gen_range(0..1000);
        Duration::from_millis(exponential.saturating_add(jitter).min(self.max_delay_ms))
    }
}

/// Runs an operation, retrying transient failures with exponential backoff
///
/// The operation runs at most `1 + max_retries` times. The last error is
/// returned unchanged once retries are exhausted.
///
/// # Arguments
///
/// * `policy` - Retry count and backoff bounds
/// * `op` - Factory producing a fresh future per attempt
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let backoff = policy.backoff(attempt);
                tracing::warn!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    err,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
