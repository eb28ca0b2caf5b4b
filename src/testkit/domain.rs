//! Builders for provisioning primitives used across tests.

use std::sync::Arc;

use crate::application::ProvisionContext;
use crate::domain::{
    AccountContext, AccountMetadata, Category, DefinitionRegistry, ResourceDefinition,
};
use crate::port::{Backends, SubscriptionService};

/// Subaccount used by [`context`] and [`account_metadata`].
pub const SUBACCOUNT: &str = "sub-test";

/// An application definition with default settings.
pub fn app(name: &str) -> ResourceDefinition {
    ResourceDefinition::new(name, Category::Application)
}

/// A Cloud Foundry service definition with default settings.
pub fn service(name: &str) -> ResourceDefinition {
    ResourceDefinition::new(name, Category::Service)
}

/// A registry that must be valid.
pub fn registry(
    applications: Vec<ResourceDefinition>,
    services: Vec<ResourceDefinition>,
) -> DefinitionRegistry {
    DefinitionRegistry::try_new(applications, services).expect("test registry must be valid")
}

/// Metadata carrying only the test subaccount.
pub fn account_metadata() -> AccountMetadata {
    AccountMetadata::default().with_subaccount_id(SUBACCOUNT)
}

/// A context for the test subaccount.
pub fn context(subscriptions: Arc<dyn SubscriptionService>, backends: Backends) -> ProvisionContext {
    ProvisionContext::new(AccountContext::new(SUBACCOUNT), subscriptions, backends)
}
