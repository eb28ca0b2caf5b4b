//! Application services (use cases).
//!
//! These services drive the domain model through the outbound ports: the
//! creation orchestrator fires creation actions in dependency order, the
//! status tracker waits for the account to converge, and [`Provisioner`]
//! runs both for one use case.

mod context;
mod pause;

pub mod eligibility;
pub mod instance;
pub mod orchestrator;
pub mod provision;
pub mod tracker;

pub use context::ProvisionContext;
pub use eligibility::{can_trigger, prerequisites_available};
pub use instance::{create_service_instance, get_service_status, CreationOutcome};
pub use orchestrator::{CreationOrchestrator, PassSummary};
pub use provision::{ProvisionReport, Provisioner};
pub use tracker::{
    await_convergence, check_all_service_instances_created, check_all_subscriptions_available,
    determine_poll_interval, Convergence,
};
