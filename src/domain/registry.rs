//! The flat set of definitions for one provisioning run.

use std::collections::HashSet;
use std::time::Duration;

use super::{Category, DefinitionId, Kind, ResourceDefinition};
use crate::error::ConfigError;

/// Owner of every definition in a run.
///
/// Applications and services are kept in their declaration order; that order
/// drives parent resolution in the forest builder and the order of snapshots
/// in the aggregated metadata.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    applications: Vec<ResourceDefinition>,
    services: Vec<ResourceDefinition>,
}

impl DefinitionRegistry {
    /// Build a registry from separate application and service lists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a definition sits in the wrong list for
    /// its category, a name is declared twice within a kind, or a definition
    /// lists itself as a dependency.
    pub fn try_new(
        applications: Vec<ResourceDefinition>,
        services: Vec<ResourceDefinition>,
    ) -> Result<Self, ConfigError> {
        let registry = Self {
            applications,
            services,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Build a registry from one mixed list, split by category.
    ///
    /// # Errors
    ///
    /// Same as [`try_new`](Self::try_new).
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ResourceDefinition>,
    ) -> Result<Self, ConfigError> {
        let (applications, services) = definitions
            .into_iter()
            .partition(|def| def.category == Category::Application);
        Self::try_new(applications, services)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (kind, defs) in [
            (Kind::Application, &self.applications),
            (Kind::Service, &self.services),
        ] {
            let mut seen = HashSet::new();
            for def in defs {
                let category_matches = match kind {
                    Kind::Application => def.category == Category::Application,
                    Kind::Service => def.category.is_service(),
                };
                if !category_matches {
                    let reason = format!("{} cannot be used for {kind} '{}'", def.category, def.name);
                    return Err(ConfigError::InvalidValue {
                        field: "category",
                        reason,
                    });
                }
                if !seen.insert(def.name.as_str()) {
                    return Err(ConfigError::DuplicateName {
                        kind,
                        name: def.name.clone(),
                    });
                }
                let self_listed = match kind {
                    Kind::Application => def.required_applications.contains(&def.name),
                    Kind::Service => def.required_services.contains(&def.name),
                };
                if self_listed {
                    return Err(ConfigError::SelfReference {
                        kind,
                        name: def.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn applications(&self) -> &[ResourceDefinition] {
        &self.applications
    }

    #[must_use]
    pub fn services(&self) -> &[ResourceDefinition] {
        &self.services
    }

    #[must_use]
    pub fn has_applications(&self) -> bool {
        !self.applications.is_empty()
    }

    #[must_use]
    pub fn has_services(&self) -> bool {
        !self.services.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.applications.len() + self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a definition.
    #[must_use]
    pub fn get(&self, id: DefinitionId) -> Option<&ResourceDefinition> {
        match id.kind() {
            Kind::Application => self.applications.get(id.index()),
            Kind::Service => self.services.get(id.index()),
        }
    }

    /// Look up a definition for mutation.
    pub fn get_mut(&mut self, id: DefinitionId) -> Option<&mut ResourceDefinition> {
        match id.kind() {
            Kind::Application => self.applications.get_mut(id.index()),
            Kind::Service => self.services.get_mut(id.index()),
        }
    }

    /// Find a definition by kind and name.
    #[must_use]
    pub fn find(&self, kind: Kind, name: &str) -> Option<DefinitionId> {
        let defs = match kind {
            Kind::Application => &self.applications,
            Kind::Service => &self.services,
        };
        defs.iter().position(|def| def.name == name).map(|index| match kind {
            Kind::Application => DefinitionId::application(index),
            Kind::Service => DefinitionId::service(index),
        })
    }

    /// All keys: applications first, then services, each in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = DefinitionId> {
        let apps = (0..self.applications.len()).map(DefinitionId::application);
        let services = (0..self.services.len()).map(DefinitionId::service);
        apps.chain(services)
    }

    /// All definitions with their keys, in [`ids`](Self::ids) order.
    pub fn iter(&self) -> impl Iterator<Item = (DefinitionId, &ResourceDefinition)> {
        let apps = self
            .applications
            .iter()
            .enumerate()
            .map(|(i, def)| (DefinitionId::application(i), def));
        let services = self
            .services
            .iter()
            .enumerate()
            .map(|(i, def)| (DefinitionId::service(i), def));
        apps.chain(services)
    }

    pub(crate) fn applications_mut(&mut self) -> &mut [ResourceDefinition] {
        &mut self.applications
    }

    pub(crate) fn services_mut(&mut self) -> &mut [ResourceDefinition] {
        &mut self.services
    }
}

/// Run-wide timing for both control loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTiming {
    /// Base pause between two passes of a loop.
    pub poll_interval: Duration,
    /// Upper bound on how long each loop runs.
    pub timeout: Duration,
}

impl RunTiming {
    #[must_use]
    pub const fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}
