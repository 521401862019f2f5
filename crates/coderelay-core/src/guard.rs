//! Credential presence check that runs before any network activity.

use crate::core_types::ProviderCredentials;
use crate::errors::GatewayError;

#[derive(Debug, Clone, Default)]
pub struct ConfigurationGuard {
    credentials: Option<ProviderCredentials>,
}

impl ConfigurationGuard {
    /// Incomplete credentials (an empty id or secret) are treated as absent.
    pub fn new(credentials: Option<ProviderCredentials>) -> Self {
        Self {
            credentials: credentials.filter(ProviderCredentials::is_complete),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn check(&self) -> Result<&ProviderCredentials, GatewayError> {
        match &self.credentials {
            Some(credentials) => Ok(credentials),
            None => {
                log::warn!("Rejecting execution request: provider credentials are not configured");
                Err(GatewayError::Configuration)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_fail_check() {
        let guard = ConfigurationGuard::new(None);
        assert!(!guard.is_configured());
        assert_eq!(guard.check().unwrap_err(), GatewayError::Configuration);
    }

    #[test]
    fn test_empty_secret_counts_as_missing() {
        let guard = ConfigurationGuard::new(Some(ProviderCredentials::new("client", "")));
        assert!(!guard.is_configured());
        assert!(guard.check().is_err());
    }

    #[test]
    fn test_complete_credentials_pass() {
        let guard = ConfigurationGuard::new(Some(ProviderCredentials::new("client", "secret")));
        let credentials = guard.check().unwrap();
        assert_eq!(credentials.client_id, "client");
    }
}
