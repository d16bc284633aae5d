//! Retry disciplines and HTTP failure classification.
//!
//! - `policy.rs`: exponential backoff with jitter
//! - `classify.rs`: non-2xx status + error envelope → [`LlmError`]
//!
//! [`RetryExecutor`] runs one model's attempt budget. It never crosses
//! models: the orchestrator builds a fresh executor per model in the chain.

mod classify;
pub mod policy;

pub use classify::{ErrorEnvelope, classify_http_error};
pub use policy::{JitterStrategy, RetryPolicy};

use std::future::Future;
use std::time::Duration;

use crate::defaults::LEGACY_RETRY_UNIT;
use crate::error::LlmError;
use crate::utils::cancel::CancelHandle;

/// Which retry discipline governs one model's attempts.
#[derive(Debug, Clone, Default)]
pub enum RetryOptions {
    /// Exactly one attempt.
    #[default]
    None,
    /// Up to `max_retries + 1` attempts, sleeping `attempt² × 100ms` between them.
    Fixed { max_retries: u32 },
    /// Up to `max_attempts` attempts with exponential backoff and jitter.
    Policy(RetryPolicy),
}

impl RetryOptions {
    pub const fn fixed(max_retries: u32) -> Self {
        Self::Fixed { max_retries }
    }

    pub fn policy(policy: RetryPolicy) -> Self {
        Self::Policy(policy)
    }

    /// Attempts allowed per model. Always at least one.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_retries } => max_retries.saturating_add(1),
            Self::Policy(policy) => policy.max_attempts.max(1),
        }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { .. } => LEGACY_RETRY_UNIT.saturating_mul(attempt.saturating_mul(attempt)),
            Self::Policy(policy) => policy.calculate_delay(attempt.saturating_sub(1)),
        }
    }

    pub fn should_retry(&self, error: &LlmError) -> bool {
        match self {
            Self::Policy(policy) => policy.should_retry(error),
            _ => error.is_retryable(),
        }
    }
}

/// Outcome of one model's attempt budget.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, LlmError>,
    /// Attempts actually started, the first one included.
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    /// Attempts beyond the first.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Retry executor that handles the actual retry logic
pub struct RetryExecutor<'a> {
    options: &'a RetryOptions,
    cancel: Option<&'a CancelHandle>,
}

impl<'a> RetryExecutor<'a> {
    pub const fn new(options: &'a RetryOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Abort backoff sleeps when `cancel` fires.
    pub const fn with_cancel(mut self, cancel: Option<&'a CancelHandle>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute `operation` (called with the 1-based attempt number) until it
    /// succeeds, fails with a non-retryable error, or the budget runs out.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        self.execute_with_handler(operation, |_, _| true).await
    }

    /// Like [`execute`](Self::execute), with an extra veto: `handler`
    /// returning `false` stops retrying after that error.
    pub async fn execute_with_handler<F, Fut, T, H>(
        &self,
        mut operation: F,
        mut handler: H,
    ) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
        H: FnMut(&LlmError, u32) -> bool,
    {
        let max_attempts = self.options.max_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            let give_up = attempt >= max_attempts
                || error.is_cancelled()
                || !self.options.should_retry(&error)
                || !handler(&error, attempt);
            if give_up {
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            let delay = self.options.delay_after(attempt);
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after backoff"
            );
            if let Err(cancelled) = crate::utils::cancel::sleep(delay, self.cancel).await {
                return RetryOutcome {
                    result: Err(cancelled),
                    attempts: attempt,
                };
            }
        }
    }
}
