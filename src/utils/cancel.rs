//! Cancellation utilities
//!
//! A [`CancelHandle`] is passed into a call and observed by every suspension
//! point of that call: the rate-limit gate, the in-flight request, stream
//! reads and backoff sleeps.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Futures raced against this handle are dropped,
    /// which closes the underlying HTTP connection.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A handle cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Cancel automatically once `deadline` has elapsed.
    pub fn cancel_after(&self, deadline: Duration) {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(deadline) => token.cancel(),
            }
        });
    }
}

impl From<CancellationToken> for CancelHandle {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

pub(crate) fn cancelled_error() -> LlmError {
    LlmError::Cancelled("request cancelled by caller".to_string())
}

/// Run `future` unless `cancel` fires first.
pub async fn run_cancellable<F, T>(cancel: Option<&CancelHandle>, future: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    let Some(cancel) = cancel else {
        return future.await;
    };
    if cancel.is_cancelled() {
        return Err(cancelled_error());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled_error()),
        result = future => result,
    }
}

/// Sleep for `delay`, returning early with `Cancelled` if `cancel` fires.
pub async fn sleep(delay: Duration, cancel: Option<&CancelHandle>) -> Result<(), LlmError> {
    run_cancellable(cancel, async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}
