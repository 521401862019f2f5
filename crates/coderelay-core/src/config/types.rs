//! Configuration type definitions for the execution gateway
//!
//! Every section is optional: an empty YAML document (or no file at all)
//! yields a gateway with default timeouts, the built-in language table and
//! no credentials, which is a valid state that answers every request with a
//! "not configured" result.

use crate::core_types::ProviderCredentials;
use crate::errors::ConfigError;
use crate::executors::jdoodle::{DEFAULT_API_URL, DEFAULT_VERSION_INDEX};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Upper bound for `timeouts.request_timeout_secs` (one day).
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 86_400;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Extra or replacement label → runtime identifier pairs.
    #[serde(default)]
    pub languages: BTreeMap<String, String>,
    /// Reject labels missing from the language table instead of forwarding them.
    #[serde(default)]
    pub strict_languages: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_version_index")]
    pub version_index: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Default bound on a whole execute-remote request, retries included.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_version_index() -> String {
    DEFAULT_VERSION_INDEX.to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_url: default_api_url(),
            version_index: default_version_index(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("version_index", &self.version_index)
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    /// Credentials when both values are set and non-empty.
    pub fn credentials(&self) -> Option<ProviderCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => {
                Some(ProviderCredentials::new(id.clone(), secret.clone())).filter(ProviderCredentials::is_complete)
            }
            _ => None,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        if !self.enabled {
            return RetryPolicy::disabled();
        }
        RetryPolicy::default()
            .with_max_retries(self.max_retries)
            .with_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            )
    }
}

impl TimeoutConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let api_url = self.provider.api_url.trim();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "provider.api_url must be an http(s) URL, got '{}'",
                self.provider.api_url
            )));
        }

        if self.provider.version_index.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "provider.version_index cannot be empty".to_string(),
            ));
        }

        if self.timeouts.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeouts.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.timeouts.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "timeouts.request_timeout_secs cannot exceed {} seconds",
                MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        if self.timeouts.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeouts.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry.enabled && self.retry.max_retries > 0 {
            if self.retry.initial_backoff_ms == 0 {
                return Err(ConfigError::Invalid(
                    "retry.initial_backoff_ms must be greater than 0".to_string(),
                ));
            }
            if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
                return Err(ConfigError::Invalid(
                    "retry.max_backoff_ms cannot be smaller than retry.initial_backoff_ms"
                        .to_string(),
                ));
            }
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for (label, runtime) in &self.languages {
            if label.trim().is_empty() || runtime.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "languages entry '{}: {}' must have a non-empty label and runtime",
                    label, runtime
                )));
            }
            if let Some(previous) = seen.insert(label.trim().to_lowercase(), label) {
                return Err(ConfigError::Invalid(format!(
                    "languages entries '{}' and '{}' differ only in case",
                    previous, label
                )));
            }
        }

        Ok(())
    }
}
