//! Remote execution backends.
//!
//! `ExecutionBackend` is the seam between the gateway and whatever service
//! actually compiles and runs submitted code. The JDoodle client is the
//! production implementation; tests substitute their own.

use crate::core_types::{ProviderCredentials, ProviderResponse};
use crate::deadline::Deadline;
use crate::errors::BackendError;
use async_trait::async_trait;
use std::sync::Arc;

pub mod jdoodle;

pub use jdoodle::JDoodleClient;

/// Payload handed to a backend once the language has been resolved.
#[derive(Debug, Clone, Copy)]
pub struct BackendRequest<'a> {
    pub script: &'a str,
    pub language: &'a str,
    pub credentials: &'a ProviderCredentials,
}

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Issues one call to the backend, bounded by `deadline`.
    async fn execute(
        &self,
        request: &BackendRequest<'_>,
        deadline: &Deadline,
    ) -> Result<ProviderResponse, BackendError>;

    fn name(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl<T: ExecutionBackend + ?Sized> ExecutionBackend for Arc<T> {
    async fn execute(
        &self,
        request: &BackendRequest<'_>,
        deadline: &Deadline,
    ) -> Result<ProviderResponse, BackendError> {
        (**self).execute(request, deadline).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
