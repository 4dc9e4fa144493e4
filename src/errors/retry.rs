use std::future::Future;
use std::time::Duration;

use super::classification::Classify;
use tracing::warn;

/// Bounded retry schedule: `max_retries` extra attempts, delays doubling from `base_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Delay to wait before each retry, in order. Length equals `max_retries`.
    pub fn delays(&self) -> Vec<Duration> {
        (0..self.max_retries)
            .map(|n| self.base_delay.saturating_mul(2u32.saturating_pow(n)))
            .collect()
    }
}

/// Execute an async operation with retry logic.
///
/// Retries only if the error is classified as retryable and the delay
/// schedule is not exhausted. Returns the last error otherwise.
pub async fn with_retry<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut factory: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + std::fmt::Display,
{
    let delays = policy.delays();
    let max_attempts = delays.len() + 1;
    let mut attempt = 0usize;

    loop {
        let err = match factory().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let classification = err.classify();
        if !classification.retryable {
            warn!(
                operation = operation_name,
                error_type = classification.error_type,
                error = %err,
                "Non-retryable error, failing immediately"
            );
            return Err(err);
        }

        let Some(delay) = delays.get(attempt).copied() else {
            warn!(
                operation = operation_name,
                attempt = attempt + 1,
                max = max_attempts,
                error = %err,
                "Max retries exhausted"
            );
            return Err(err);
        };

        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            max = max_attempts,
            error_type = classification.error_type,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after error"
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
