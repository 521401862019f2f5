//! The execution gateway: guard, resolve, call, normalize.
//!
//! `ExecutionGateway` holds only immutable, shared state, so a single
//! instance is cloned into every request handler.

use crate::config::GatewayConfig;
use crate::core_types::{ExecutionRequest, ExecutionResult, ProviderCredentials};
use crate::deadline::Deadline;
use crate::errors::{ConfigError, GatewayError};
use crate::executors::{BackendRequest, ExecutionBackend, JDoodleClient};
use crate::guard::ConfigurationGuard;
use crate::language::LanguageResolver;
use crate::normalizer::normalize;
use crate::retry::RetryingBackend;
use std::sync::Arc;

#[derive(Clone)]
pub struct ExecutionGateway {
    backend: Arc<dyn ExecutionBackend>,
    guard: ConfigurationGuard,
    resolver: LanguageResolver,
    strict_languages: bool,
}

impl ExecutionGateway {
    pub fn new(
        backend: Arc<dyn ExecutionBackend>,
        credentials: Option<ProviderCredentials>,
    ) -> Self {
        Self {
            backend,
            guard: ConfigurationGuard::new(credentials),
            resolver: LanguageResolver::new(),
            strict_languages: false,
        }
    }

    pub fn with_resolver(mut self, resolver: LanguageResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Reject labels that are not in the language table instead of
    /// forwarding them to the backend.
    pub fn with_strict_languages(mut self, strict: bool) -> Self {
        self.strict_languages = strict;
        self
    }

    /// Builds the production gateway: a JDoodle client, wrapped in the retry
    /// layer unless retries are switched off.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = JDoodleClient::from_config(&config.provider, &config.timeouts)?;
        let policy = config.retry.policy();
        let backend: Arc<dyn ExecutionBackend> = if policy.is_enabled() {
            log::debug!(
                "Retrying transient backend failures up to {} times",
                policy.max_retries
            );
            Arc::new(RetryingBackend::new(client, policy))
        } else {
            Arc::new(client)
        };

        let resolver = LanguageResolver::with_overrides(
            config
                .languages
                .iter()
                .map(|(label, runtime)| (label.as_str(), runtime.clone())),
        );

        Ok(Self::new(backend, config.provider.credentials())
            .with_resolver(resolver)
            .with_strict_languages(config.strict_languages))
    }

    pub fn is_configured(&self) -> bool {
        self.guard.is_configured()
    }

    pub fn resolver(&self) -> &LanguageResolver {
        &self.resolver
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Runs one request to completion. Every failure is folded into the
    /// returned result; nothing here panics or propagates an error.
    pub async fn execute(&self, request: &ExecutionRequest, deadline: &Deadline) -> ExecutionResult {
        match self.try_execute(request, deadline).await {
            Ok(result) => result,
            Err(err) => {
                log::debug!("Execution request ended with {}", err.error_type());
                err.into_result()
            }
        }
    }

    async fn try_execute(
        &self,
        request: &ExecutionRequest,
        deadline: &Deadline,
    ) -> Result<ExecutionResult, GatewayError> {
        let credentials = self.guard.check()?;
        request.validate()?;

        let resolved = self.resolver.resolve(&request.language);
        if !resolved.known {
            if self.strict_languages {
                return Err(GatewayError::UnsupportedLanguage(request.language.clone()));
            }
            log::warn!(
                "Language '{}' is not in the language table; forwarding it unchanged",
                request.language
            );
        }

        log::info!(
            "Executing {} bytes of '{}' code via {} as '{}'",
            request.code.len(),
            request.language,
            self.backend.name(),
            resolved.runtime
        );

        let backend_request = BackendRequest {
            script: &request.code,
            language: &resolved.runtime,
            credentials,
        };

        let response = self
            .backend
            .execute(&backend_request, deadline)
            .await
            .map_err(|err| {
                log::error!("{} execution failed: {}", self.backend.name(), err);
                GatewayError::Transport(err)
            })?;

        Ok(normalize(response))
    }
}

impl std::fmt::Debug for ExecutionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionGateway")
            .field("backend", &self.backend.name())
            .field("configured", &self.guard.is_configured())
            .field("languages", &self.resolver.len())
            .field("strict_languages", &self.strict_languages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::ProviderResponse;
    use crate::errors::BackendError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every call and answers with a fixed outcome.
    struct RecordingBackend {
        outcome: Result<ProviderResponse, BackendError>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingBackend {
        fn new(outcome: Result<ProviderResponse, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExecutionBackend for RecordingBackend {
        async fn execute(
            &self,
            request: &BackendRequest<'_>,
            _deadline: &Deadline,
        ) -> Result<ProviderResponse, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.script.to_string(), request.language.to_string()));
            self.outcome.clone()
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn credentials() -> Option<ProviderCredentials> {
        Some(ProviderCredentials::new("id", "secret"))
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_successful_python_run() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::with_output("1\n", Some(0))));
        let gateway = ExecutionGateway::new(backend.clone(), credentials());

        let result = gateway
            .execute(&ExecutionRequest::new("print(1)", "python"), &deadline())
            .await;

        assert_eq!(result, ExecutionResult::success("1\n", Some(0)));
        assert_eq!(
            backend.calls(),
            vec![("print(1)".to_string(), "python3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_makes_no_calls() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::with_output("x", Some(0))));
        let gateway = ExecutionGateway::new(backend.clone(), None);

        let result = gateway
            .execute(&ExecutionRequest::new("print(1)", "python"), &deadline())
            .await;

        assert!(!result.success);
        assert_eq!(
            result.output,
            "External code execution not configured. Please set up JDoodle API credentials."
        );
        assert_eq!(result.exit_code, None);
        assert!(backend.calls().is_empty());
        assert!(!gateway.is_configured());
    }

    #[tokio::test]
    async fn test_guard_runs_before_validation() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::default()));
        let gateway = ExecutionGateway::new(backend.clone(), None);

        let result = gateway
            .execute(&ExecutionRequest::new("", ""), &deadline())
            .await;
        assert_eq!(result, crate::normalizer::not_configured());
    }

    #[tokio::test]
    async fn test_language_label_is_case_insensitive() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::with_output("ok", Some(0))));
        let gateway = ExecutionGateway::new(backend.clone(), credentials());

        for label in ["Cpp", "CPP", "c++"] {
            gateway
                .execute(&ExecutionRequest::new("int main(){}", label), &deadline())
                .await;
        }

        let runtimes: Vec<String> = backend.calls().into_iter().map(|(_, l)| l).collect();
        assert_eq!(runtimes, vec!["cpp17", "cpp17", "cpp17"]);
    }

    #[tokio::test]
    async fn test_unknown_language_is_forwarded_literally() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::with_output("hi", Some(0))));
        let gateway = ExecutionGateway::new(backend.clone(), credentials());

        let result = gateway
            .execute(&ExecutionRequest::new("puts 'hi'", "ruby"), &deadline())
            .await;

        assert!(result.success);
        assert_eq!(backend.calls()[0].1, "ruby");
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_unknown_language() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::with_output("hi", Some(0))));
        let gateway =
            ExecutionGateway::new(backend.clone(), credentials()).with_strict_languages(true);

        let result = gateway
            .execute(&ExecutionRequest::new("puts 'hi'", "ruby"), &deadline())
            .await;

        assert_eq!(result, ExecutionResult::failure("Language 'ruby' is not supported", None));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_result() {
        let backend = RecordingBackend::new(Err(BackendError::Transport(
            "connect ECONNREFUSED".to_string(),
        )));
        let gateway = ExecutionGateway::new(backend, credentials());

        let result = gateway
            .execute(&ExecutionRequest::new("print(1)", "python"), &deadline())
            .await;

        assert_eq!(
            result,
            ExecutionResult::failure("External execution error: connect ECONNREFUSED", None)
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::with_error(
            "Traceback: NameError",
            Some(1),
        )));
        let gateway = ExecutionGateway::new(backend, credentials());

        let result = gateway
            .execute(&ExecutionRequest::new("prnt(1)", "python"), &deadline())
            .await;

        assert_eq!(result, ExecutionResult::failure("Traceback: NameError", Some(1)));
    }

    #[tokio::test]
    async fn test_missing_code_is_rejected() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::default()));
        let gateway = ExecutionGateway::new(backend.clone(), credentials());

        let result = gateway
            .execute(&ExecutionRequest::new("", "python"), &deadline())
            .await;

        assert_eq!(
            result,
            ExecutionResult::failure("Missing code or language parameter", None)
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolver_overrides_apply() {
        let backend = RecordingBackend::new(Ok(ProviderResponse::with_output("ok", Some(0))));
        let gateway = ExecutionGateway::new(backend.clone(), credentials())
            .with_resolver(LanguageResolver::with_overrides([("Python", "python2")]));

        gateway
            .execute(&ExecutionRequest::new("print 1", "python"), &deadline())
            .await;
        assert_eq!(backend.calls()[0].1, "python2");
    }

    #[test]
    fn test_from_config_builds_unconfigured_gateway() {
        let gateway = ExecutionGateway::from_config(&GatewayConfig::default()).unwrap();
        assert!(!gateway.is_configured());
        assert_eq!(gateway.backend_name(), "jdoodle");
        assert!(gateway.resolver().is_known("typescript"));
    }
}
