//! Outbound request pacing.
//!
//! One gate is shared by every call made through an orchestrator, whatever the
//! model or backend. It is injected rather than global so tests can use
//! [`NoopGate`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Awaited before every network attempt.
#[async_trait]
pub trait RateLimitGate: Send + Sync {
    /// Wait until the next request may start.
    ///
    /// Dropping the returned future gives the slot up, which is how callers
    /// cancel a wait.
    async fn acquire(&self);
}

/// No pacing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGate;

#[async_trait]
impl RateLimitGate for NoopGate {
    async fn acquire(&self) {}
}

/// Enforces a minimum interval between consecutive request starts.
///
/// Waiters queue on the internal mutex in FIFO order, so concurrent callers
/// are released one at a time, `interval` apart.
#[derive(Debug)]
pub struct MinIntervalGate {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl MinIntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::new(None),
        }
    }

    /// At most `requests` starts per second. Zero disables pacing.
    pub fn per_second(requests: u32) -> Self {
        let interval = match requests {
            0 => Duration::ZERO,
            n => Duration::from_secs(1) / n,
        };
        Self::new(interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl RateLimitGate for MinIntervalGate {
    async fn acquire(&self) {
        let mut last_start = self.last_start.lock().await;
        if let Some(last) = *last_start {
            let next = last + self.interval;
            if Instant::now() < next {
                tracing::trace!(
                    wait_ms = (next - Instant::now()).as_millis() as u64,
                    "rate limit gate waiting"
                );
                tokio::time::sleep_until(next).await;
            }
        }
        *last_start = Some(Instant::now());
    }
}
