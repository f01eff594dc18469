//! Async retry with exponential backoff

use std::future::Future;
use std::time::Duration;

/// Default maximum attempts for a page fetch
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay in milliseconds for exponential backoff
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Upper bound for a single backoff delay
pub const MAX_DELAY_MS: u64 = 30_000;

/// Backoff settings for [`retry_with_backoff_async`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Delay before the attempt following `attempt` (1-based), doubling each
    /// time and capped at [`MAX_DELAY_MS`]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2_u64
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(MAX_DELAY_MS))
    }
}

/// Retry an async operation while `is_retryable` holds for its error.
///
/// Returns `Ok((value, attempts))` on success, or `Err((error, attempts))`
/// once the error is permanent or the attempts are exhausted.
pub async fn retry_with_backoff_async<T, E, F, Fut, R>(
    policy: RetryPolicy,
    is_retryable: R,
    mut operation: F,
) -> Result<(T, u32), (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempts)),
            Err(e) => {
                if attempts >= max_attempts || !is_retryable(&e) {
                    return Err((e, attempts));
                }
                let delay = policy.delay_after(attempts);
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
