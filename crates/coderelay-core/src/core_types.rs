//! Request, response and credential types shared across the gateway.
//!
//! `ExecutionRequest` and `ExecutionResult` form the canonical contract with
//! callers; `ProviderResponse` mirrors the execution backend's wire format and
//! never leaves the crate boundary unnormalized.

use crate::errors::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned when a request arrives without code or language.
pub const MISSING_PARAMETERS: &str = "Missing code or language parameter";

/// A single code submission from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }

    /// Rejects submissions with empty code or an empty language label.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.code.is_empty() || self.language.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(MISSING_PARAMETERS.to_string()));
        }
        Ok(())
    }
}

/// The canonical result handed back to every caller, whatever happened upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub exit_code: Option<i64>,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, exit_code: Option<i64>) -> Self {
        Self {
            success: true,
            output: output.into(),
            exit_code,
        }
    }

    pub fn failure(output: impl Into<String>, exit_code: Option<i64>) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code,
        }
    }
}

/// Response body of a JDoodle-compatible execution backend.
///
/// Every field is optional: the normalizer has to cope with whatever subset
/// the provider chooses to send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
}

impl ProviderResponse {
    pub fn with_output(output: impl Into<String>, status_code: Option<i64>) -> Self {
        Self {
            output: Some(output.into()),
            status_code,
            ..Default::default()
        }
    }

    pub fn with_error(error: impl Into<String>, status_code: Option<i64>) -> Self {
        Self {
            error: Some(error.into()),
            status_code,
            ..Default::default()
        }
    }
}

/// Client id and secret for the execution backend.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Both values present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
