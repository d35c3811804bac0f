//! Retry Policy
//!
//! Wraps a fallible remote call with exponential backoff and jitter.
//!
//! ## Behavior
//!
//! - **Classification**: a hook decides whether a failure is retryable; the
//!   default uses [`ScribeError::is_retryable`] (the backend error table).
//! - **Backoff**: sleep `delay + uniform(0, 0.1 * delay)`, then double `delay`.
//! - **Outcome**: a non-retryable failure returns [`ScribeError::Fatal`]
//!   immediately; running out of attempts returns
//!   [`ScribeError::RetryExhausted`] wrapping the last cause.
//!
//! Operations must be safe to re-issue: delivery is at-least-once.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::RetryConfig;
use crate::constants::retry::{BACKOFF_FACTOR, JITTER_FRACTION};
use crate::types::{ErrorCategory, Result, ScribeError};

/// Exponential backoff policy for remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Per-call bookkeeping; never persisted
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    last_category: Option<ErrorCategory>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.initial_delay())
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `op` with the default classification
    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_with(operation, op, ScribeError::is_retryable).await
    }

    /// Run `op`, deciding retryability with `is_retryable`
    pub async fn run_with<T, F, Fut, C>(
        &self,
        operation: &str,
        mut op: F,
        is_retryable: C,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&ScribeError) -> bool,
    {
        let mut state = RetryState {
            attempt: 0,
            last_category: None,
        };

        loop {
            state.attempt += 1;

            let err = match op().await {
                Ok(value) => {
                    if state.attempt > 1 {
                        debug!(
                            operation,
                            attempt = state.attempt,
                            "Succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            // Already-final outcomes from nested policies pass through untouched
            if err.is_call_failure() {
                return Err(err);
            }

            state.last_category = Some(err.category());

            if !is_retryable(&err) {
                error!(
                    operation,
                    attempt = state.attempt,
                    category = ?state.last_category,
                    error = %err,
                    "Non-retryable failure"
                );
                return Err(ScribeError::Fatal {
                    operation: operation.to_string(),
                    source: Box::new(err),
                });
            }

            if state.attempt >= self.max_attempts {
                error!(
                    operation,
                    attempts = state.attempt,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(ScribeError::RetryExhausted {
                    operation: operation.to_string(),
                    attempts: state.attempt,
                    source: Box::new(err),
                });
            }

            let wait = backoff_sleep(self.delay_for(state.attempt));
            warn!(
                operation,
                attempt = state.attempt,
                max_attempts = self.max_attempts,
                category = ?state.last_category,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );
            sleep(wait).await;
        }
    }

    /// Base delay before retry number `retry` (1-based), without jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(BACKOFF_FACTOR.saturating_pow(exponent))
    }
}

/// Uniform jitter in `[0, 0.1 * delay)`
pub fn random_jitter(delay: Duration) -> Duration {
    let max_jitter_ns = (delay.as_nanos() as f64 * JITTER_FRACTION) as u64;
    if max_jitter_ns == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::rng().random_range(0..max_jitter_ns))
}

/// Total sleep before the next attempt: `delay` plus jitter
pub fn backoff_sleep(delay: Duration) -> Duration {
    delay + random_jitter(delay)
}
