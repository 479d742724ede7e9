//! Retry loop with exponential backoff for outbound generation calls.
//!
//! Retries live here and nowhere else in the pipeline. Rate-limited failures
//! back off on a slower schedule than ordinary ones.

use std::future::Future;
use std::time::Duration;

use super::AiClientError;

/// Retry schedule for a client's outbound calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff base for ordinary failures.
    pub base_delay: Duration,
    /// Backoff base when the failure is classified as rate limiting.
    pub rate_limit_base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            rate_limit_base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Wait before the retry that follows failed attempt `attempt` (1-based):
    /// `2^attempt * base`, where the base depends on rate-limit
    /// classification. Ordinary failures wait 1s, 2s, 4s...; rate-limited
    /// ones 4s, 8s, 16s...
    pub fn delay_after(&self, attempt: u32, rate_limited: bool) -> Duration {
        let base = if rate_limited {
            self.rate_limit_base_delay
        } else {
            self.base_delay
        };
        base * 2u32.saturating_pow(attempt)
    }
}

/// Drive `operation` until it succeeds or the attempt budget is spent.
///
/// The final attempt's classified error is returned as-is; intermediate
/// failures are logged and slept through per the policy.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, AiClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiClientError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= policy.max_attempts => return Err(error),
            Err(error) => {
                let wait = policy.delay_after(attempt, error.is_rate_limited());
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %error,
                    "generation attempt failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
