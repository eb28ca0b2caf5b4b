//! Environment backend port.
//!
//! Each [`TargetEnvironment`] is served by one [`EnvironmentBackend`] that
//! knows how to create a service instance there and how to read its status.
//! [`Backends`] is the lookup table the application layer dispatches through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{AccountContext, ResourceDefinition, ServiceStatus, TargetEnvironment};
use crate::error::{ConfigError, Result};

/// Instance provisioning in one target environment.
#[async_trait]
pub trait EnvironmentBackend: Send + Sync {
    /// The environment this backend serves.
    fn environment(&self) -> TargetEnvironment;

    /// Issue the creation of the instance described by `service`.
    ///
    /// Called once the instance is known not to exist yet.
    async fn create_instance(
        &self,
        ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<()>;

    /// Current status of the instance described by `service`.
    async fn instance_status(
        &self,
        ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<ServiceStatus>;
}

/// Lookup table from target environment to backend.
#[derive(Clone, Default)]
pub struct Backends {
    table: HashMap<TargetEnvironment, Arc<dyn EnvironmentBackend>>,
}

impl Backends {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` for the environment it reports, replacing any
    /// previous one.
    pub fn register(&mut self, backend: Arc<dyn EnvironmentBackend>) {
        self.table.insert(backend.environment(), backend);
    }

    #[must_use]
    pub fn with(mut self, backend: Arc<dyn EnvironmentBackend>) -> Self {
        self.register(backend);
        self
    }

    /// Backend for `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedEnvironment`] if none is registered.
    pub fn get(
        &self,
        environment: TargetEnvironment,
    ) -> std::result::Result<&dyn EnvironmentBackend, ConfigError> {
        self.table
            .get(&environment)
            .map(|backend| &**backend)
            .ok_or(ConfigError::UnsupportedEnvironment(environment))
    }

    /// True if a backend is registered for `environment`.
    #[must_use]
    pub fn supports(&self, environment: TargetEnvironment) -> bool {
        self.table.contains_key(&environment)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut environments: Vec<_> = self.table.keys().map(|env| env.as_str()).collect();
        environments.sort_unstable();
        f.debug_struct("Backends")
            .field("environments", &environments)
            .finish()
    }
}
