// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lifecycle Event Model
//!
//! The envelope the external event framework delivers once per invocation,
//! and the validated view of its configuration properties. All state lives
//! in this envelope and in the control plane; the reconciler carries nothing
//! across invocations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use url::Url;

use crate::domain::runtime::{JwtAuthorizerConfig, ProvisionError};

/// Declared lifecycle operation for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleIntent {
    Create,
    Update,
    Delete,
}

/// One unit of work, as delivered by the event framework.
///
/// `physical_id` is absent on Create and present on Update/Delete, where it
/// carries the arn returned by an earlier create. It is the framework's
/// durable handle and may be stale if a prior operation partially failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub intent: LifecycleIntent,

    /// Caller-assigned declaration identity, stable across redeploys
    pub logical_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_id: Option<String>,

    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl LifecycleEvent {
    /// Physical identifier, required on Update and Delete events.
    pub fn require_physical_id(&self) -> Result<&str, ProvisionError> {
        match self.physical_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ProvisionError::InvalidInput(format!(
                "{:?} event for '{}' carries no physical identifier",
                self.intent, self.logical_id
            ))),
        }
    }
}

/// Validated runtime configuration extracted from event properties.
///
/// Parsing fails with [`ProvisionError::InvalidInput`] before any remote
/// call is made.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeProperties {
    pub container_uri: String,
    pub role_arn: String,
    pub server_protocol: String,
    pub authorizer: Option<JwtAuthorizerConfig>,
    pub env: HashMap<String, String>,
}

impl RuntimeProperties {
    pub fn from_event(event: &LifecycleEvent) -> Result<Self, ProvisionError> {
        Self::from_properties(&event.properties)
    }

    pub fn from_properties(properties: &Map<String, Value>) -> Result<Self, ProvisionError> {
        let container_uri = required_string(properties, "ContainerUri")?;
        let role_arn = required_string(properties, "RoleArn")?;
        let server_protocol = required_string(properties, "ServerProtocol")?;

        let discovery_url = optional_string(properties, "DiscoveryUrl")?;
        let allowed_client = optional_string(properties, "AllowedClient")?;

        // DiscoveryUrl and AllowedClient form one authorizer block and must
        // appear together.
        let authorizer = match (discovery_url, allowed_client) {
            (Some(discovery_url), Some(allowed_client)) => {
                Url::parse(&discovery_url).map_err(|e| {
                    ProvisionError::InvalidInput(format!(
                        "DiscoveryUrl '{}' is not a valid URL: {}",
                        discovery_url, e
                    ))
                })?;
                Some(JwtAuthorizerConfig {
                    discovery_url,
                    allowed_client,
                })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(ProvisionError::InvalidInput(
                    "DiscoveryUrl requires AllowedClient".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(ProvisionError::InvalidInput(
                    "AllowedClient requires DiscoveryUrl".to_string(),
                ))
            }
        };

        let env = match properties.get("Env") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(map)) => {
                let mut env = HashMap::with_capacity(map.len());
                for (key, value) in map {
                    match value {
                        Value::String(value) => {
                            env.insert(key.clone(), value.clone());
                        }
                        other => {
                            return Err(ProvisionError::InvalidInput(format!(
                                "Env entry '{}' must be a string, got {}",
                                key, other
                            )))
                        }
                    }
                }
                env
            }
            Some(other) => {
                return Err(ProvisionError::InvalidInput(format!(
                    "Env must be a mapping of strings, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            container_uri,
            role_arn,
            server_protocol,
            authorizer,
            env,
        })
    }
}

fn required_string(properties: &Map<String, Value>, key: &str) -> Result<String, ProvisionError> {
    match optional_string(properties, key)? {
        Some(value) => Ok(value),
        None => Err(ProvisionError::InvalidInput(format!(
            "Missing required property '{}'",
            key
        ))),
    }
}

fn optional_string(
    properties: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ProvisionError> {
    match properties.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Err(ProvisionError::InvalidInput(
            format!("Property '{}' must not be empty", key),
        )),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(ProvisionError::InvalidInput(format!(
            "Property '{}' must be a string, got {}",
            key, other
        ))),
    }
}
