//! Service instance collaborators dispatched through the backend table.

use tracing::{debug, info};

use super::context::ProvisionContext;
use crate::domain::{InstanceState, ResourceDefinition, ServiceStatus};
use crate::error::Result;

/// What a creation request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationOutcome {
    /// A create call was issued.
    Triggered,
    /// The instance already exists and is still being provisioned (or has
    /// failed; the tracker reports that).
    InProgress,
    /// The instance already exists and is ready.
    Available,
}

/// Status of `service` in its target environment.
///
/// # Errors
///
/// Returns a configuration error if no backend serves the definition's
/// target environment, or whatever the backend reports.
pub async fn get_service_status(
    ctx: &ProvisionContext,
    service: &ResourceDefinition,
) -> Result<ServiceStatus> {
    let backend = ctx.backends.get(service.target_environment)?;
    backend.instance_status(&ctx.account, service).await
}

/// Create the instance for `service` unless it already exists.
///
/// Safe to call on every orchestrator pass: the instance status is read
/// first and the backend is only asked to create missing instances.
///
/// # Errors
///
/// Returns a configuration error for an unsupported target environment, or
/// whatever the backend reports.
pub async fn create_service_instance(
    ctx: &ProvisionContext,
    service: &ResourceDefinition,
) -> Result<CreationOutcome> {
    let backend = ctx.backends.get(service.target_environment)?;
    let status = backend.instance_status(&ctx.account, service).await?;

    match status.state {
        InstanceState::NotFound => {
            info!(
                service = %service.name,
                instance = service.instance_name(),
                plan = ?service.plan,
                environment = %service.target_environment,
                category = %service.category,
                "Creating service instance"
            );
            backend.create_instance(&ctx.account, service).await?;
            Ok(CreationOutcome::Triggered)
        }
        InstanceState::Succeeded => {
            debug!(service = %service.name, "Service instance already available");
            Ok(CreationOutcome::Available)
        }
        InstanceState::InProgress | InstanceState::Failed => {
            debug!(service = %service.name, status = %status.label, "Service instance already exists");
            Ok(CreationOutcome::InProgress)
        }
    }
}
