//! Error types for the execution gateway
//!
//! The gateway never lets a failure escape to its caller as a fault. Each
//! failure mode is classified here by where it came from (operator
//! configuration, the network path to the provider, or the provider itself) and
//! is then folded into a canonical `ExecutionResult` with `success = false`.

use crate::core_types::ExecutionResult;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("External code execution not configured. Please set up JDoodle API credentials.")]
    Configuration,
    #[error("External execution error: {0}")]
    Transport(#[from] BackendError),
    #[error("{output}")]
    Provider {
        output: String,
        exit_code: Option<i64>,
    },
    /// Only raised when strict language checking is switched on; by default
    /// unmapped labels are forwarded unchanged.
    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),
    #[error("{0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Folds the error into the canonical failure shape.
    pub fn into_result(self) -> ExecutionResult {
        let exit_code = match &self {
            GatewayError::Provider { exit_code, .. } => *exit_code,
            _ => None,
        };
        ExecutionResult::failure(self.to_string(), exit_code)
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::Configuration => "configuration_error",
            GatewayError::Transport(_) => "transport_error",
            GatewayError::Provider { .. } => "provider_error",
            GatewayError::UnsupportedLanguage(_) => "unsupported_language",
            GatewayError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Failures captured while talking to the execution backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    Transport(String),
    #[error("Request failed with status code {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request to execution backend timed out")]
    Timeout,
    #[error("request to execution backend was cancelled")]
    Cancelled,
    #[error("invalid response from execution backend: {0}")]
    Decode(String),
}

impl BackendError {
    /// Connection-level faults and provider 5xx responses may succeed on a
    /// second attempt. Client errors, bad payloads and a spent deadline never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Transport(_) => true,
            BackendError::Status { status, .. } => (500..600).contains(status),
            BackendError::Timeout | BackendError::Cancelled | BackendError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return BackendError::Decode(error_chain(&err));
        }
        BackendError::Transport(error_chain(&err))
    }
}

/// Renders an error together with its sources, e.g.
/// `error sending request for url (..): client error (Connect): Connection refused`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },
    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
