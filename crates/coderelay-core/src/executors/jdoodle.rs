use crate::config::{ProviderConfig, TimeoutConfig};
use crate::core_types::ProviderResponse;
use crate::deadline::Deadline;
use crate::errors::{BackendError, ConfigError};
use crate::executors::{BackendRequest, ExecutionBackend};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.jdoodle.com/v1/execute";
pub const DEFAULT_VERSION_INDEX: &str = "0";

/// Upper bound on how much of an error body ends up in a failure message.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecutePayload<'a> {
    script: &'a str,
    language: &'a str,
    version_index: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Clone)]
pub struct JDoodleClient {
    client: Client,
    api_url: String,
    version_index: String,
}

impl Default for JDoodleClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JDoodleClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            version_index: DEFAULT_VERSION_INDEX.to_string(),
        }
    }

    pub fn from_config(
        provider: &ProviderConfig,
        timeouts: &TimeoutConfig,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_url: provider.api_url.clone(),
            version_index: provider.version_index.clone(),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_version_index(mut self, version_index: impl Into<String>) -> Self {
        self.version_index = version_index.into();
        self
    }

    fn build_payload<'a>(&'a self, request: &BackendRequest<'a>) -> ExecutePayload<'a> {
        ExecutePayload {
            script: request.script,
            language: request.language,
            version_index: &self.version_index,
            client_id: &request.credentials.client_id,
            client_secret: &request.credentials.client_secret,
        }
    }

    async fn send(&self, request: &BackendRequest<'_>) -> Result<ProviderResponse, BackendError> {
        let payload = self.build_payload(request);
        log::debug!(
            "Sending {} bytes of {} code to {}",
            request.script.len(),
            request.language,
            self.api_url
        );

        let response = self.client.post(&self.api_url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await?;

        log::debug!("Execution backend responded with {} ({} bytes)", status, body.len());

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        serde_json::from_str::<ProviderResponse>(&body)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ExecutionBackend for JDoodleClient {
    async fn execute(
        &self,
        request: &BackendRequest<'_>,
        deadline: &Deadline,
    ) -> Result<ProviderResponse, BackendError> {
        deadline.run(self.send(request)).await
    }

    fn name(&self) -> &str {
        "jdoodle"
    }
}

/// Picks the most useful text out of a non-2xx body: the provider's own
/// `error` field when it sent JSON, otherwise the (truncated) raw body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<ProviderResponse>(body) {
        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return error;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return reason.unwrap_or("no response body").to_string();
    }

    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", truncated)
    } else {
        trimmed.to_string()
    }
}
