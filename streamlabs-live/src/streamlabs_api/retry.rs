//! Retry policy for idempotent Streamlabs API requests.
//!
//! Only GET-style requests go through [`retry_idempotent`]. Starting and ending a stream are not
//! idempotent (a repeated start may provision a second stream), so those are always sent once.

use crate::streamlabs_api::error::ClientError;
use std::future::Future;
use std::time::Duration;

/// Longest delay ever slept between two attempts, whatever the backoff or server asks for.
const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Policy controlling retry attempts and exponential backoff behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    pub max_retries: usize,
    /// Base of the exponential backoff; retry `n` waits `backoff_factor * 2^(n-1)`.
    pub backoff_factor: Duration,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Computes the delay to apply before the given retry.
    ///
    /// `retry` is 1-based: the first retry (second attempt) is `1`.
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let exponent = retry.saturating_sub(1).min(31) as u32;
        self.backoff_factor
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    /// Three retries at roughly 0.3s, 0.6s and 1.2s.
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_millis(300),
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// Executes an idempotent request with retry behavior controlled by `policy`.
///
/// `op` receives the 1-based attempt number. Errors that are not
/// [retryable](ClientError::is_retryable) are returned immediately, as is the last error once
/// the retries are exhausted. A `Retry-After` delay sent by the server replaces the computed
/// backoff for that retry.
pub(crate) async fn retry_idempotent<T, Op, Fut>(
    policy: &RetryPolicy,
    mut op: Op,
) -> Result<T, ClientError>
where
    Op: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts || !error.is_retryable() {
                    return Err(error);
                }

                let delay = error
                    .retry_after()
                    .map(|d| d.min(policy.max_backoff))
                    .unwrap_or_else(|| policy.delay_for_retry(attempt));
                tracing::debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retryable request failed"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

/// Parses a `Retry-After` header given in whole seconds.
///
/// The HTTP-date form is ignored; callers fall back to exponential backoff for it.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
}
