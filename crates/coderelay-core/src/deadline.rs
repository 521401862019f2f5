//! Caller-supplied time bound for a single execution request.
//!
//! A `Deadline` is an absolute instant plus an optional cancellation token. It
//! is threaded from the HTTP layer through the retry policy down to the
//! outbound call, so every suspension point observes the same bound.

use crate::errors::BackendError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in for "no deadline" when a timeout is too large to add to now.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    cancellation: Option<CancellationToken>,
}

impl Deadline {
    pub fn at(at: Instant) -> Self {
        Self {
            at,
            cancellation: None,
        }
    }

    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        Self::at(
            now.checked_add(timeout)
                .unwrap_or_else(|| now + FAR_FUTURE),
        )
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }

    /// Drives `operation` until it completes, the deadline passes, or the
    /// caller cancels. The latter two drop the operation mid-flight.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let bounded = tokio::time::timeout_at(self.at, operation);
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(BackendError::Cancelled),
                    outcome = bounded => outcome.unwrap_or(Err(BackendError::Timeout)),
                }
            }
            None => bounded.await.unwrap_or(Err(BackendError::Timeout)),
        }
    }

    /// Sleeps for `delay`, waking early with `Cancelled` if the caller gives up.
    pub async fn sleep(&self, delay: Duration) -> Result<(), BackendError> {
        let pause = tokio::time::sleep(delay);
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(BackendError::Cancelled),
                    _ = pause => Ok(()),
                }
            }
            None => {
                pause.await;
                Ok(())
            }
        }
    }
}
