//! Bounded retry with exponential backoff for rate-limited provider calls.
//!
//! Only [`ProviderError::RateLimited`] is retried. Every other error, and the
//! final rate-limit error once attempts are exhausted, is returned to the
//! caller unchanged. Each attempt and each backoff sleep is raced against a
//! [`CancellationToken`] so an abandoned request stops spending quota.

use finrag_config::{MAX_RETRY_ATTEMPTS, RetryConfig};
use finrag_core::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.clamp(1, MAX_RETRY_ATTEMPTS),
            initial_backoff: Duration::from_secs(config.initial_backoff_secs),
            multiplier: config.backoff_multiplier.max(1),
        }
    }

    /// Delay before retry number `retry` (0-based): 2s, 4s, 8s, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Wraps provider calls with the retry policy.
#[derive(Debug, Clone, Default)]
pub struct ResilientCaller {
    policy: RetryPolicy,
}

impl ResilientCaller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `op` until it succeeds, fails with a non-rate-limit error, or
    /// runs out of attempts.
    ///
    /// `operation` only labels log lines.
    pub async fn call<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max = self.policy.max_attempts;
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                debug!(operation, attempt, "Cancelled before attempt");
                return Err(ProviderError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                r = op() => r,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_rate_limited() || attempt >= max {
                if err.is_rate_limited() {
                    warn!(operation, attempts = attempt, "Rate limit persisted, giving up");
                }
                return Err(err);
            }

            let delay = self.policy.delay_for(attempt - 1);
            warn!(
                operation,
                attempt,
                max_attempts = max,
                delay_secs = delay.as_secs(),
                error = %err,
                "Rate limit hit, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
