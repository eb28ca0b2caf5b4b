//! Provisioning domain: definitions, their registry, the dependency forest,
//! external status types and metadata aggregation.
//!
//! Nothing in here performs I/O; the control loops in
//! [`application`](crate::application) drive these types through the ports.

mod definition;
mod id;
mod registry;

pub mod forest;
pub mod metadata;
pub mod status;

pub use definition::{Category, ExecutionStatus, ResourceDefinition, TargetEnvironment};
pub use forest::{DependencyForest, NodeId};
pub use id::{DefinitionId, Kind};
pub use metadata::{aggregate, AccountContext, AccountMetadata};
pub use registry::{DefinitionRegistry, RunTiming};
pub use status::{InstanceState, ServiceStatus, SubscriptionRecord, SubscriptionState};
