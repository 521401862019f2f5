//! Bounded retry with exponential backoff around any `ExecutionBackend`.
//!
//! The policy lives in its own decorator so it can be tuned or switched off
//! without touching the client. Only faults that may clear on a second attempt
//! (transport errors, provider 5xx) are retried, and no retry is started
//! once its backoff would run past the caller's deadline.

use crate::core_types::ProviderResponse;
use crate::deadline::Deadline;
use crate::errors::BackendError;
use crate::executors::{BackendRequest, ExecutionBackend};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;
const DEFAULT_MAX_BACKOFF_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    pub fn should_retry(&self, retries_so_far: u32, err: &BackendError) -> bool {
        retries_so_far < self.max_retries && err.is_retryable()
    }
}

fn next_backoff(current: Duration, max_backoff: Duration) -> Duration {
    if current.is_zero() {
        return max_backoff.min(Duration::from_millis(1));
    }

    current.saturating_mul(2).min(max_backoff)
}

pub struct RetryingBackend<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: ExecutionBackend> RetryingBackend<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<B: ExecutionBackend> ExecutionBackend for RetryingBackend<B> {
    async fn execute(
        &self,
        request: &BackendRequest<'_>,
        deadline: &Deadline,
    ) -> Result<ProviderResponse, BackendError> {
        let mut retries = 0;
        let mut backoff = self.policy.initial_backoff;

        loop {
            let err = match self.inner.execute(request, deadline).await {
                Ok(response) => {
                    if retries > 0 {
                        log::info!(
                            "{} call succeeded after {} retr{}",
                            self.inner.name(),
                            retries,
                            if retries == 1 { "y" } else { "ies" }
                        );
                    }
                    return Ok(response);
                }
                Err(err) => err,
            };

            if !self.policy.should_retry(retries, &err) {
                if retries > 0 {
                    log::error!(
                        "{} call failed after {} retries: {}",
                        self.inner.name(),
                        retries,
                        err
                    );
                }
                return Err(err);
            }

            if backoff >= deadline.remaining() {
                log::warn!(
                    "{} call failed ({}); not retrying, deadline leaves less than {:?}",
                    self.inner.name(),
                    err,
                    backoff
                );
                return Err(err);
            }

            retries += 1;
            log::warn!(
                "{} call failed ({}); retry {}/{} in {:?}",
                self.inner.name(),
                err,
                retries,
                self.policy.max_retries,
                backoff
            );

            deadline.sleep(backoff).await?;
            backoff = next_backoff(backoff, self.policy.max_backoff);
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::ProviderCredentials;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedBackend {
        outcomes: Mutex<VecDeque<Result<ProviderResponse, BackendError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<Result<ProviderResponse, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(VecDeque::from(outcomes)),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn execute(
            &self,
            _request: &BackendRequest<'_>,
            _deadline: &Deadline,
        ) -> Result<ProviderResponse, BackendError> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Transport("no more scripted outcomes".to_string())))
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default().with_backoff(Duration::from_millis(1), Duration::from_millis(4))
    }

    async fn run(backend: Arc<ScriptedBackend>, policy: RetryPolicy, deadline: Deadline) -> Result<ProviderResponse, BackendError> {
        let credentials = ProviderCredentials::new("id", "secret");
        let request = BackendRequest {
            script: "print(1)",
            language: "python3",
            credentials: &credentials,
        };
        RetryingBackend::new(backend, policy)
            .execute(&request, &deadline)
            .await
    }

    #[tokio::test]
    async fn test_transport_failure_is_retried_until_success() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Transport("connection reset".to_string())),
            Err(BackendError::Status { status: 502, message: "Bad Gateway".to_string() }),
            Ok(ProviderResponse::with_output("ok", Some(200))),
        ]);

        let response = run(backend.clone(), fast_policy(), Deadline::after(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(response.output.as_deref(), Some("ok"));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Transport("down".to_string())),
            Err(BackendError::Transport("down".to_string())),
            Err(BackendError::Transport("still down".to_string())),
            Ok(ProviderResponse::with_output("too late", None)),
        ]);

        let err = run(backend.clone(), fast_policy(), Deadline::after(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::Transport("still down".to_string()));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_never_retried() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Status { status: 401, message: "Unauthorized Request".to_string() }),
            Ok(ProviderResponse::with_output("unreachable", None)),
        ]);

        let err = run(backend.clone(), fast_policy(), Deadline::after(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 401, .. }));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_policy_calls_once() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Transport("down".to_string())),
            Ok(ProviderResponse::with_output("unreachable", None)),
        ]);

        let err = run(backend.clone(), RetryPolicy::disabled(), Deadline::after(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_retry_past_deadline() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Transport("down".to_string())),
            Ok(ProviderResponse::with_output("unreachable", None)),
        ]);
        let policy = RetryPolicy::default().with_backoff(Duration::from_secs(10), Duration::from_secs(10));

        let started = std::time::Instant::now();
        let err = run(backend.clone(), policy, Deadline::after(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
        assert_eq!(backend.calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let max = Duration::from_millis(2_000);
        assert_eq!(next_backoff(Duration::from_millis(200), max), Duration::from_millis(400));
        assert_eq!(next_backoff(Duration::from_millis(1_500), max), max);
        assert_eq!(next_backoff(Duration::ZERO, max), Duration::from_millis(1));
    }
}
