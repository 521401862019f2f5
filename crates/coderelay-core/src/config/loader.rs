//! Configuration loader for YAML files and environment resolution
//!
//! Credentials normally come from the process environment. A YAML file can
//! carry the same values (directly or as `$VAR` references) together with
//! retry, timeout and language-table settings; environment credentials always
//! win over the file.

use crate::config::types::GatewayConfig;
use crate::errors::ConfigError;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tokio::fs;

pub const CLIENT_ID_ENV: &str = "JDOODLE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "JDOODLE_CLIENT_SECRET";
pub const API_URL_ENV: &str = "JDOODLE_API_URL";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults plus whatever the process environment provides.
    pub fn from_env() -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_env_map(&vars)
    }

    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<GatewayConfig, ConfigError> {
        let mut config = GatewayConfig::default();
        Self::apply_env(&mut config, vars);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_str(&content, &vars)
    }

    /// Load configuration from a YAML string, resolving against `vars`.
    pub fn from_str(
        content: &str,
        vars: &HashMap<String, String>,
    ) -> Result<GatewayConfig, ConfigError> {
        let mut config: GatewayConfig = if content.trim().is_empty() {
            GatewayConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        Self::resolve_references(&mut config, vars);
        Self::apply_env(&mut config, vars);
        config.validate()?;

        Ok(config)
    }

    /// Replaces `$VAR` values with the matching environment variable. An unset
    /// variable leaves the credential absent rather than passing `$VAR` on.
    fn resolve_references(config: &mut GatewayConfig, vars: &HashMap<String, String>) {
        for slot in [
            &mut config.provider.client_id,
            &mut config.provider.client_secret,
        ] {
            if let Some(value) = slot.as_deref() {
                if let Some(name) = value.strip_prefix('$') {
                    *slot = vars.get(name).cloned();
                }
            }
        }

        if let Some(name) = config.provider.api_url.strip_prefix('$') {
            if let Some(url) = vars.get(name) {
                config.provider.api_url = url.clone();
            }
        }
    }

    fn apply_env(config: &mut GatewayConfig, vars: &HashMap<String, String>) {
        if let Some(id) = non_empty(vars, CLIENT_ID_ENV) {
            config.provider.client_id = Some(id);
        }
        if let Some(secret) = non_empty(vars, CLIENT_SECRET_ENV) {
            config.provider.client_secret = Some(secret);
        }
        if let Some(url) = non_empty(vars, API_URL_ENV) {
            config.provider.api_url = url;
        }
    }
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key).filter(|v| !v.is_empty()).cloned()
}
