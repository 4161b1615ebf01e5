// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::event::{LifecycleEvent, LifecycleIntent, RuntimeProperties};
use crate::domain::name::sanitize_runtime_name;
use crate::domain::runtime::{ControlPlane, ProvisionError, RuntimeSpec};
use std::sync::Arc;
use tracing::{info, warn};

/// Translates declared lifecycle events into control-plane calls.
///
/// One invocation handles one event and carries no state to the next; the
/// event framework serializes events per declared resource and owns retry
/// and rollback policy. Failures propagate untouched, except that Delete
/// treats an unresolvable physical identifier as already-removed so that
/// teardown stays idempotent across retries.
pub struct RuntimeReconciler {
    control_plane: Arc<dyn ControlPlane>,
}

impl RuntimeReconciler {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    /// Handle one lifecycle event, returning the physical identifier the
    /// event framework should track for the declared resource.
    pub async fn handle(&self, event: &LifecycleEvent) -> Result<String, ProvisionError> {
        match event.intent {
            LifecycleIntent::Create => self.create(event).await,
            LifecycleIntent::Update => self.update(event).await,
            LifecycleIntent::Delete => self.delete(event).await,
        }
    }

    /// Translate a tracked arn into the provider-internal runtime id.
    ///
    /// Walks every listing page before concluding the runtime is gone.
    /// Resolution is repeated on each invocation rather than cached, so
    /// concurrent external changes surface on the next event.
    pub async fn resolve_runtime_id(&self, arn: &str) -> Result<Option<String>, ProvisionError> {
        let mut next_token = None;
        loop {
            let page = self.control_plane.list_runtimes(next_token).await?;
            if let Some(runtime) = page.runtimes.iter().find(|r| r.arn == arn) {
                return Ok(Some(runtime.runtime_id.clone()));
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(None),
            }
        }
    }

    async fn create(&self, event: &LifecycleEvent) -> Result<String, ProvisionError> {
        let properties = RuntimeProperties::from_event(event)?;
        let name = sanitize_runtime_name(&event.logical_id)?;

        // No pre-existence check: at-most-once delivery of Create events is
        // the framework's contract, and a duplicate produces a second
        // runtime rather than a partial failure here.
        let spec = RuntimeSpec::from(properties);
        let created = self.control_plane.create_runtime(&name, &spec).await?;

        info!(name = %name, arn = %created.arn, status = ?created.status, "Created agent runtime");
        Ok(created.arn)
    }

    async fn update(&self, event: &LifecycleEvent) -> Result<String, ProvisionError> {
        let properties = RuntimeProperties::from_event(event)?;
        let arn = event.require_physical_id()?;

        let runtime_id = self
            .resolve_runtime_id(arn)
            .await?
            .ok_or_else(|| ProvisionError::NotFound(arn.to_string()))?;

        // The full desired configuration is reissued; the control plane does
        // not support partial updates.
        let spec = RuntimeSpec::from(properties);
        let updated = self.control_plane.update_runtime(&runtime_id, &spec).await?;

        info!(runtime_id = %runtime_id, arn = %updated.arn, status = ?updated.status, "Updated agent runtime");
        Ok(updated.arn)
    }

    async fn delete(&self, event: &LifecycleEvent) -> Result<String, ProvisionError> {
        let arn = event.require_physical_id()?;

        match self.resolve_runtime_id(arn).await? {
            Some(runtime_id) => {
                self.control_plane.delete_runtime(&runtime_id).await?;
                info!(runtime_id = %runtime_id, arn = %arn, "Deleted agent runtime");
            }
            None => {
                warn!(arn = %arn, "Agent runtime not found on delete, treating as already removed");
            }
        }

        Ok(arn.to_string())
    }
}
