//! Exponential backoff policy with configurable jitter.

use rand::Rng;
use std::time::Duration;

use crate::error::LlmError;

/// How randomness is applied to a computed backoff delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JitterStrategy {
    /// Use the computed delay as is.
    None,
    /// Shift the delay by a random amount within `±factor × delay`.
    /// The factor is clamped to `0.0..=1.0`.
    Proportional(f64),
    /// Pick uniformly in `0..=delay`.
    Full,
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per model, the first one included
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    pub jitter: JitterStrategy,
    /// Custom retry condition function
    pub retry_condition: Option<fn(&LlmError) -> bool>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: JitterStrategy::Proportional(0.1),
            retry_condition: None,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub const fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_retry_condition(mut self, condition: fn(&LlmError) -> bool) -> Self {
        self.retry_condition = Some(condition);
        self
    }

    /// Check if an error should be retried
    pub fn should_retry(&self, error: &LlmError) -> bool {
        match self.retry_condition {
            Some(condition) => condition(error),
            None => error.is_retryable(),
        }
    }

    /// Delay before retry number `retry` (0 = the wait after the first failure),
    /// before jitter. Never exceeds `max_delay`.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let millis =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.max(1.0).powi(exponent);
        let cap = self.max_delay.as_millis() as f64;
        Duration::from_millis(millis.min(cap).max(0.0) as u64)
    }

    /// Delay before retry number `retry` with jitter applied, clamped to
    /// `max_delay`.
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let delay = self.base_delay(retry);
        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Proportional(factor) => proportional_jitter(delay, factor),
            JitterStrategy::Full => {
                let millis = delay.as_millis() as u64;
                Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
            }
        };
        jittered.min(self.max_delay)
    }
}

fn proportional_jitter(delay: Duration, factor: f64) -> Duration {
    let range = delay.as_millis() as f64 * factor.clamp(0.0, 1.0);
    if range <= 0.0 {
        return delay;
    }
    let jitter = rand::thread_rng().gen_range(-range..=range);
    Duration::from_millis((delay.as_millis() as f64 + jitter).max(0.0) as u64)
}
