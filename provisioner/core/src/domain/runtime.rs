// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::event::RuntimeProperties;

/// Network mode applied to every provisioned runtime.
pub const NETWORK_MODE_PUBLIC: &str = "PUBLIC";

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Agent runtime not found: {0}")]
    NotFound(String),
    #[error("Control plane call failed: {0}")]
    Provider(String),
}

/// Provider-reported lifecycle state of a runtime.
///
/// Mutating calls return as soon as the control plane accepts them, so a
/// runtime may still be transitioning when its identifier is handed back to
/// the event framework. The reconciler records the status but does not
/// branch on it; the framework owns stabilization and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeStatus {
    Creating,
    CreateFailed,
    Updating,
    UpdateFailed,
    Ready,
    Deleting,
}

/// Custom JWT authorizer attached to a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtAuthorizerConfig {
    /// OIDC discovery URL of the token issuer
    pub discovery_url: String,

    /// Client identifier allowed to call the runtime.
    /// Single value for now; the control plane models this as a set.
    pub allowed_client: String,
}

/// Desired runtime configuration, sent in full on both create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    pub container_uri: String,
    pub role_arn: String,
    pub server_protocol: String,
    pub network_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<JwtAuthorizerConfig>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl From<RuntimeProperties> for RuntimeSpec {
    fn from(properties: RuntimeProperties) -> Self {
        Self {
            container_uri: properties.container_uri,
            role_arn: properties.role_arn,
            server_protocol: properties.server_protocol,
            network_mode: NETWORK_MODE_PUBLIC.to_string(),
            authorizer: properties.authorizer,
            env: properties.env,
        }
    }
}

/// One runtime as reported by the listing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRuntime {
    /// Globally unique identifier, tracked by the event framework
    pub arn: String,

    /// Provider-internal key required by update and delete calls
    pub runtime_id: String,

    pub status: RuntimeStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A single page of the runtime listing.
#[derive(Debug, Clone, Default)]
pub struct RuntimeListing {
    pub runtimes: Vec<RemoteRuntime>,

    /// Continuation token; `None` on the final page
    pub next_token: Option<String>,
}

/// Result of an accepted create call.
#[derive(Debug, Clone)]
pub struct ProvisionedRuntime {
    pub arn: String,
    pub runtime_id: String,
    pub status: RuntimeStatus,
}

/// Result of an accepted update call.
#[derive(Debug, Clone)]
pub struct UpdatedRuntime {
    pub arn: String,
    pub status: RuntimeStatus,
}

/// Port onto the remote agent-runtime control plane.
///
/// The create surface is asymmetric with update/delete: create returns the
/// arn the framework tracks, while update and delete require the
/// provider-internal runtime id, which is only recoverable by listing.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn list_runtimes(
        &self,
        next_token: Option<String>,
    ) -> Result<RuntimeListing, ProvisionError>;

    async fn create_runtime(
        &self,
        name: &str,
        spec: &RuntimeSpec,
    ) -> Result<ProvisionedRuntime, ProvisionError>;

    async fn update_runtime(
        &self,
        runtime_id: &str,
        spec: &RuntimeSpec,
    ) -> Result<UpdatedRuntime, ProvisionError>;

    async fn delete_runtime(&self, runtime_id: &str) -> Result<(), ProvisionError>;
}
