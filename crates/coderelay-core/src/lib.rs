//! Core of the coderelay remote code-execution gateway.
//!
//! This crate accepts source code together with a free-text language label,
//! resolves the label to an execution-backend runtime, forwards the payload to
//! a JDoodle-compatible service and normalizes whatever comes back into one
//! canonical result shape.
//!
//! # Architecture Overview
//!
//! - **Configuration guard**: refuses to touch the network without credentials
//! - **Language resolver**: case-insensitive label → runtime table with pass-through
//! - **Execution backends**: the `ExecutionBackend` seam and the JDoodle client
//! - **Retry layer**: bounded exponential backoff wrapped around any backend
//! - **Result normalizer**: total mapping from provider responses to `ExecutionResult`
//! - **Gateway**: composes the above behind a single `execute` call
//! - **Configuration system**: environment plus optional YAML file

pub mod config;
pub mod core_types;
pub mod deadline;
pub mod errors;
pub mod executors;
pub mod gateway;
pub mod guard;
pub mod language;
pub mod normalizer;
pub mod retry;

pub use config::*;
pub use core_types::{ExecutionRequest, ExecutionResult, ProviderCredentials, ProviderResponse};
pub use deadline::Deadline;
pub use errors::{BackendError, ConfigError, GatewayError};
pub use executors::{BackendRequest, ExecutionBackend, JDoodleClient};
pub use gateway::ExecutionGateway;
pub use language::{LanguageResolver, ResolvedLanguage};
pub use retry::{RetryPolicy, RetryingBackend};

#[cfg(test)]
pub mod test_utils;
