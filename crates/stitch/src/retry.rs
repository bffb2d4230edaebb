// Bounded retry with exponential backoff for segment and manifest requests.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Result, StitchError};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Adds up to `base_delay / 2` of random delay, never beyond `max_delay`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let backoff = self
            .base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        if !self.jitter {
            return backoff;
        }

        let headroom = self.max_delay.saturating_sub(backoff);
        let spread = (self.base_delay / 2).min(headroom);
        let spread_ms = u64::try_from(spread.as_millis()).unwrap_or(u64::MAX);
        if spread_ms == 0 {
            return backoff;
        }
        backoff + Duration::from_millis(rand::rng().random_range(0..spread_ms))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. `op` receives the attempt number, starting at 0.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    what: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        if token.is_cancelled() {
            return Err(StitchError::Cancelled);
        }

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= policy.max_retries || !err.is_retryable() {
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        attempt += 1;
        warn!(
            operation = what,
            attempt,
            max = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after transient error"
        );

        tokio::select! {
            _ = token.cancelled() => return Err(StitchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
