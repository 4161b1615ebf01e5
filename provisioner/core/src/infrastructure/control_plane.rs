// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// HTTP Control Plane Adapter
//
// Anti-Corruption Layer for the agent runtime control-plane API. Wire types
// mirror the provider schema (camelCase, nested configuration blocks) and
// are kept out of the domain layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::config::ProvisionerConfig;
use crate::domain::runtime::{
    ControlPlane, ProvisionError, ProvisionedRuntime, RemoteRuntime, RuntimeListing, RuntimeSpec,
    RuntimeStatus, UpdatedRuntime,
};

const DEFAULT_PAGE_SIZE: u32 = 100;

/// Client for the hosted agent runtime control plane.
pub struct HttpControlPlane {
    base_url: String,
    client: Client,
    api_key: Option<String>,
    page_size: u32,
}

impl HttpControlPlane {
    /// Create a new control plane client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the page size requested from the listing operation.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Build a client from a provisioner configuration, resolving any
    /// "env:VAR_NAME" API key indirection.
    pub fn from_config(config: &ProvisionerConfig) -> Result<Self, ProvisionError> {
        let mut control_plane = Self::new(&config.endpoint).with_page_size(config.page_size);
        control_plane.api_key = config.resolved_api_key()?;
        Ok(control_plane)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProvisionError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ProvisionError::Provider(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisionError::Provider(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn list_runtimes(
        &self,
        next_token: Option<String>,
    ) -> Result<RuntimeListing, ProvisionError> {
        let url = format!("{}/v1/agent-runtimes", self.base_url);

        let mut query = vec![("maxResults", self.page_size.to_string())];
        if let Some(token) = next_token {
            query.push(("nextToken", token));
        }

        let response = self.send(self.client.get(&url).query(&query)).await?;
        let listing: ListRuntimesResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Provider(format!("Failed to parse response: {}", e)))?;

        Ok(RuntimeListing {
            runtimes: listing
                .agent_runtimes
                .into_iter()
                .map(RuntimeSummary::into_domain)
                .collect(),
            next_token: listing.next_token,
        })
    }

    async fn create_runtime(
        &self,
        name: &str,
        spec: &RuntimeSpec,
    ) -> Result<ProvisionedRuntime, ProvisionError> {
        let url = format!("{}/v1/agent-runtimes", self.base_url);
        let body = RuntimeMutation::from_spec(Some(name), spec);

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let created: CreateRuntimeResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Provider(format!("Failed to parse response: {}", e)))?;

        Ok(ProvisionedRuntime {
            arn: created.agent_runtime_arn,
            runtime_id: created.agent_runtime_id,
            status: created.status,
        })
    }

    async fn update_runtime(
        &self,
        runtime_id: &str,
        spec: &RuntimeSpec,
    ) -> Result<UpdatedRuntime, ProvisionError> {
        let url = format!("{}/v1/agent-runtimes/{}", self.base_url, runtime_id);
        let body = RuntimeMutation::from_spec(None, spec);

        let response = self.send(self.client.put(&url).json(&body)).await?;
        let updated: UpdateRuntimeResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Provider(format!("Failed to parse response: {}", e)))?;

        Ok(UpdatedRuntime {
            arn: updated.agent_runtime_arn,
            status: updated.status,
        })
    }

    async fn delete_runtime(&self, runtime_id: &str) -> Result<(), ProvisionError> {
        let url = format!("{}/v1/agent-runtimes/{}", self.base_url, runtime_id);
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeMutation {
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_runtime_name: Option<String>,
    agent_runtime_artifact: ArtifactConfiguration,
    protocol_configuration: ProtocolConfiguration,
    network_configuration: NetworkConfiguration,
    role_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorizer_configuration: Option<AuthorizerConfiguration>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    environment_variables: HashMap<String, String>,
}

impl RuntimeMutation {
    fn from_spec(name: Option<&str>, spec: &RuntimeSpec) -> Self {
        Self {
            agent_runtime_name: name.map(str::to_string),
            agent_runtime_artifact: ArtifactConfiguration {
                container_configuration: ContainerConfiguration {
                    container_uri: spec.container_uri.clone(),
                },
            },
            protocol_configuration: ProtocolConfiguration {
                server_protocol: spec.server_protocol.clone(),
            },
            network_configuration: NetworkConfiguration {
                network_mode: spec.network_mode.clone(),
            },
            role_arn: spec.role_arn.clone(),
            authorizer_configuration: spec.authorizer.as_ref().map(|authorizer| {
                AuthorizerConfiguration {
                    custom_jwt_authorizer: CustomJwtAuthorizer {
                        discovery_url: authorizer.discovery_url.clone(),
                        allowed_client: authorizer.allowed_client.clone(),
                    },
                }
            }),
            environment_variables: spec.env.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactConfiguration {
    container_configuration: ContainerConfiguration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerConfiguration {
    container_uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolConfiguration {
    server_protocol: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkConfiguration {
    network_mode: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizerConfiguration {
    custom_jwt_authorizer: CustomJwtAuthorizer,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomJwtAuthorizer {
    discovery_url: String,
    allowed_client: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRuntimeResponse {
    agent_runtime_arn: String,
    agent_runtime_id: String,
    status: RuntimeStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRuntimeResponse {
    agent_runtime_arn: String,
    status: RuntimeStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListRuntimesResponse {
    #[serde(default)]
    agent_runtimes: Vec<RuntimeSummary>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeSummary {
    agent_runtime_arn: String,
    agent_runtime_id: String,
    status: RuntimeStatus,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl RuntimeSummary {
    fn into_domain(self) -> RemoteRuntime {
        RemoteRuntime {
            arn: self.agent_runtime_arn,
            runtime_id: self.agent_runtime_id,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn spec() -> RuntimeSpec {
        RuntimeSpec {
            container_uri: "ecr://img:1".to_string(),
            role_arn: "arn:aws:iam::1:role/r".to_string(),
            server_protocol: "HTTP".to_string(),
            network_mode: "PUBLIC".to_string(),
            authorizer: None,
            env: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_create_posts_provider_schema() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/agent-runtimes")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "agentRuntimeName": "my_agent",
                "agentRuntimeArtifact": {
                    "containerConfiguration": { "containerUri": "ecr://img:1" }
                },
                "protocolConfiguration": { "serverProtocol": "HTTP" },
                "networkConfiguration": { "networkMode": "PUBLIC" },
                "roleArn": "arn:aws:iam::1:role/r"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "agentRuntimeArn": "arn:runtime/my_agent",
                    "agentRuntimeId": "rt-123",
                    "status": "CREATING"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let control_plane = HttpControlPlane::new(server.url()).with_api_key("sk-test");
        let created = control_plane.create_runtime("my_agent", &spec()).await.unwrap();

        assert_eq!(created.arn, "arn:runtime/my_agent");
        assert_eq!(created.runtime_id, "rt-123");
        assert_eq!(created.status, RuntimeStatus::Creating);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_omits_name_and_targets_runtime_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/v1/agent-runtimes/rt-123")
            .match_body(Matcher::Json(json!({
                "agentRuntimeArtifact": {
                    "containerConfiguration": { "containerUri": "ecr://img:1" }
                },
                "protocolConfiguration": { "serverProtocol": "HTTP" },
                "networkConfiguration": { "networkMode": "PUBLIC" },
                "roleArn": "arn:aws:iam::1:role/r"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "agentRuntimeArn": "arn:runtime/my_agent",
                    "status": "UPDATING"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let control_plane = HttpControlPlane::new(server.url());
        let updated = control_plane.update_runtime("rt-123", &spec()).await.unwrap();

        assert_eq!(updated.arn, "arn:runtime/my_agent");
        assert_eq!(updated.status, RuntimeStatus::Updating);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_forwards_page_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/agent-runtimes")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("maxResults".into(), "2".into()),
                Matcher::UrlEncoded("nextToken".into(), "page-2".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "agentRuntimes": [{
                        "agentRuntimeArn": "arn:runtime/a",
                        "agentRuntimeId": "rt-a",
                        "status": "READY"
                    }],
                    "nextToken": "page-3"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let control_plane = HttpControlPlane::new(server.url()).with_page_size(2);
        let listing = control_plane
            .list_runtimes(Some("page-2".to_string()))
            .await
            .unwrap();

        assert_eq!(listing.runtimes.len(), 1);
        assert_eq!(listing.runtimes[0].runtime_id, "rt-a");
        assert_eq!(listing.next_token.as_deref(), Some("page-3"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authorizer_block_serialized_when_present() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/agent-runtimes")
            .match_body(Matcher::PartialJson(json!({
                "authorizerConfiguration": {
                    "customJwtAuthorizer": {
                        "discoveryUrl": "https://issuer.example/.well-known/openid-configuration",
                        "allowedClient": "client-1"
                    }
                },
                "environmentVariables": { "LOG_LEVEL": "debug" }
            })))
            .with_status(200)
            .with_body(
                json!({
                    "agentRuntimeArn": "arn:runtime/my_agent",
                    "agentRuntimeId": "rt-123",
                    "status": "CREATING"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut with_extras = spec();
        with_extras.authorizer = Some(crate::domain::runtime::JwtAuthorizerConfig {
            discovery_url: "https://issuer.example/.well-known/openid-configuration".to_string(),
            allowed_client: "client-1".to_string(),
        });
        with_extras.env.insert("LOG_LEVEL".to_string(), "debug".to_string());

        let control_plane = HttpControlPlane::new(server.url());
        control_plane.create_runtime("my_agent", &with_extras).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_provider_failure_maps_to_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/v1/agent-runtimes/rt-123")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let control_plane = HttpControlPlane::new(server.url());
        let result = control_plane.delete_runtime("rt-123").await;

        match result {
            Err(ProvisionError::Provider(message)) => {
                assert!(message.contains("500"));
                assert!(message.contains("internal error"));
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }
}
