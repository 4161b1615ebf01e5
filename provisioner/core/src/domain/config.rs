// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provisioner Configuration Types
//
// Defines how the provisioner locates and authenticates against the agent
// runtime control plane:
// - YAML manifest loading
// - Environment variable overrides
// - "env:VAR_NAME" indirection for secrets

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::runtime::ProvisionError;

/// Environment override for the control plane base URL.
pub const ENDPOINT_ENV: &str = "AEGIS_CONTROL_PLANE_URL";

/// Environment override for the control plane API key.
pub const API_KEY_ENV: &str = "AEGIS_CONTROL_PLANE_API_KEY";

fn default_page_size() -> u32 {
    100
}

/// Connection settings for the agent runtime control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Control plane base URL (e.g., "https://runtimes.100monkeys.ai")
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Page size requested from the listing operation
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl ProvisionerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            page_size: default_page_size(),
        }
    }

    /// Load a configuration manifest from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ProvisionError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::InvalidInput(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut config: Self = serde_yaml::from_str(&raw).map_err(|e| {
            ProvisionError::InvalidInput(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Build a configuration purely from the environment.
    pub fn from_env() -> Result<Self, ProvisionError> {
        let endpoint = std::env::var(ENDPOINT_ENV).map_err(|_| {
            ProvisionError::InvalidInput(format!(
                "No config file given and {} is not set",
                ENDPOINT_ENV
            ))
        })?;
        let mut config = Self::new(endpoint);
        config.api_key = std::env::var(API_KEY_ENV).ok();
        Ok(config)
    }

    /// Environment variables take precedence over manifest values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            self.api_key = Some(api_key);
        }
    }

    /// Resolve the configured API key, following "env:VAR_NAME" indirection.
    pub fn resolved_api_key(&self) -> Result<Option<String>, ProvisionError> {
        match self.api_key.as_deref() {
            None => Ok(None),
            Some(value) => match value.strip_prefix("env:") {
                None => Ok(Some(value.to_string())),
                Some(var) => match std::env::var(var) {
                    Ok(resolved) => Ok(Some(resolved)),
                    Err(_) => Err(ProvisionError::InvalidInput(format!(
                        "API key references unset environment variable '{}'",
                        var
                    ))),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_literal_api_key_passes_through() {
        let mut config = ProvisionerConfig::new("https://cp.example");
        config.api_key = Some("sk-literal".to_string());
        assert_eq!(config.resolved_api_key().unwrap().as_deref(), Some("sk-literal"));
    }

    #[test]
    fn test_env_indirection_resolves() {
        std::env::set_var("TEST_PROVISIONER_KEY", "sk-from-env");
        let mut config = ProvisionerConfig::new("https://cp.example");
        config.api_key = Some("env:TEST_PROVISIONER_KEY".to_string());
        assert_eq!(
            config.resolved_api_key().unwrap().as_deref(),
            Some("sk-from-env")
        );
    }

    #[test]
    fn test_env_indirection_unset_fails() {
        let mut config = ProvisionerConfig::new("https://cp.example");
        config.api_key = Some("env:TEST_PROVISIONER_KEY_UNSET".to_string());
        assert!(matches!(
            config.resolved_api_key(),
            Err(ProvisionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_api_key_is_none() {
        let config = ProvisionerConfig::new("https://cp.example");
        assert!(config.resolved_api_key().unwrap().is_none());
    }

    #[test]
    fn test_yaml_manifest_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint: https://cp.example").unwrap();
        writeln!(file, "api_key: sk-test").unwrap();

        let config = ProvisionerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.endpoint, "https://cp.example");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_unreadable_manifest_fails() {
        let result = ProvisionerConfig::from_yaml_file(Path::new("/nonexistent/provisioner.yaml"));
        assert!(matches!(result, Err(ProvisionError::InvalidInput(_))));
    }
}
