//! Creation orchestrator.
//!
//! Walks the dependency forest on every pass and fires the creation action of
//! each definition whose prerequisites are available. The orchestrator never
//! decides completion: it keeps passing until the run timeout elapses or it is
//! told to stop.

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info};

use super::context::{absorb_transient, ProvisionContext};
use super::eligibility::can_trigger;
use super::instance::{create_service_instance, CreationOutcome};
use super::pause::{pause, Pause};
use crate::domain::{
    DefinitionId, DefinitionRegistry, DependencyForest, ExecutionStatus, Kind, ResourceDefinition,
    RunTiming,
};
use crate::error::Result;

/// Status changes made during one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Definitions moved to TRIGGERED.
    pub triggered: usize,
    /// Definitions moved to AVAILABLE without a new trigger.
    pub available: usize,
}

/// Fires creation actions in dependency order.
pub struct CreationOrchestrator<'a> {
    ctx: &'a ProvisionContext,
    forest: &'a DependencyForest,
}

impl<'a> CreationOrchestrator<'a> {
    pub fn new(ctx: &'a ProvisionContext, forest: &'a DependencyForest) -> Self {
        Self { ctx, forest }
    }

    /// Visit every reachable node once and trigger the eligible ones.
    ///
    /// # Errors
    ///
    /// Returns fatal errors only; transient collaborator failures are logged
    /// and the definition is retried on the next pass.
    pub async fn run_pass(&self, registry: &mut DefinitionRegistry) -> Result<PassSummary> {
        let mut summary = PassSummary::default();

        for &node in self.forest.walk() {
            let id = self.forest.definition(node);
            let Some(def) = registry.get(id) else {
                continue;
            };
            if def.entitle_only {
                debug!(definition = %def.name, "Entitlement only, nothing to create");
                continue;
            }
            if !can_trigger(self.ctx, self.forest, registry, id).await? {
                continue;
            }

            let action = match id.kind() {
                Kind::Application => "subscribe",
                Kind::Service => "create instance",
            };
            let next = absorb_transient(self.trigger(id, def).await, &def.name, action)?;

            let Some(next) = next else {
                continue;
            };
            if let Some(def) = registry.get_mut(id) {
                if def.advance(next) {
                    match next {
                        ExecutionStatus::Triggered => summary.triggered += 1,
                        ExecutionStatus::Available => summary.available += 1,
                        _ => {}
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn trigger(&self, id: DefinitionId, def: &ResourceDefinition) -> Result<ExecutionStatus> {
        match id.kind() {
            Kind::Application => {
                let subscribed = self
                    .ctx
                    .subscriptions
                    .is_app_subscribed(&self.ctx.account, &def.name, def.plan.as_deref())
                    .await?;
                if subscribed {
                    debug!(app = %def.name, "Already subscribed");
                    return Ok(ExecutionStatus::Available);
                }
                info!(app = %def.name, plan = ?def.plan, "Subscribing to app");
                self.ctx.subscriptions.subscribe_app(&self.ctx.account, def).await?;
                Ok(ExecutionStatus::Triggered)
            }
            Kind::Service => match create_service_instance(self.ctx, def).await? {
                CreationOutcome::Available => Ok(ExecutionStatus::Available),
                CreationOutcome::Triggered | CreationOutcome::InProgress => {
                    Ok(ExecutionStatus::Triggered)
                }
            },
        }
    }

    /// Pass repeatedly until `timing.timeout` has elapsed or `stop` turns true.
    ///
    /// The registry lock is held for the duration of each pass. Returns the
    /// number of passes made.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error and returns it.
    pub async fn run_provisioning_loop(
        &self,
        registry: &Mutex<DefinitionRegistry>,
        timing: RunTiming,
        mut stop: watch::Receiver<bool>,
    ) -> Result<u32> {
        let started = Instant::now();
        let mut passes = 0u32;

        while started.elapsed() < timing.timeout {
            if *stop.borrow() {
                break;
            }
            let summary = {
                let mut registry = registry.lock().await;
                self.run_pass(&mut registry).await?
            };
            passes += 1;
            debug!(
                pass = passes,
                triggered = summary.triggered,
                available = summary.available,
                "Orchestrator pass complete"
            );

            if pause(timing.poll_interval, &mut stop).await == Pause::Stopped {
                break;
            }
        }

        debug!(passes, elapsed_secs = started.elapsed().as_secs(), "Orchestrator stopped");
        Ok(passes)
    }
}
