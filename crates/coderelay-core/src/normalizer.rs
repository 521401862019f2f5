//! Conversion of provider responses into the canonical result.
//!
//! `normalize` is total: whatever subset of fields the backend returns, the
//! caller gets a populated `ExecutionResult`. Empty strings are treated the
//! same as missing fields.

use crate::core_types::{ExecutionResult, ProviderResponse};
use crate::errors::{BackendError, GatewayError};

/// Output used when the backend returned neither output nor error text.
pub const NO_OUTPUT: &str = "No output";

pub fn normalize(response: ProviderResponse) -> ExecutionResult {
    let ProviderResponse {
        output,
        error,
        status_code,
        ..
    } = response;

    let output = non_empty(output);
    let error = non_empty(error);

    match error {
        None => ExecutionResult::success(output.unwrap_or_else(|| NO_OUTPUT.to_string()), status_code),
        Some(error) => GatewayError::Provider {
            output: output.unwrap_or(error),
            exit_code: status_code,
        }
        .into_result(),
    }
}

/// Result for a request turned away because credentials are missing.
pub fn not_configured() -> ExecutionResult {
    GatewayError::Configuration.into_result()
}

/// Result for a call that never produced a usable provider response.
pub fn transport_failure(err: BackendError) -> ExecutionResult {
    GatewayError::Transport(err).into_result()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
