//! Single entry point running both control loops for one use case.

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::context::ProvisionContext;
use super::orchestrator::CreationOrchestrator;
use super::pause::stopped;
use super::tracker::{await_convergence, Convergence};
use crate::domain::{AccountMetadata, DefinitionRegistry, DependencyForest, RunTiming};
use crate::error::{ConfigError, ProvisionError, Result};

/// Outcome of a converged run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub run_id: Uuid,
    /// Account metadata with the created resources appended.
    pub metadata: AccountMetadata,
    /// Final state of every definition.
    pub registry: DefinitionRegistry,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of orchestrator passes made.
    pub passes: u32,
}

impl ProvisionReport {
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Runs the creation orchestrator and the status tracker side by side.
#[derive(Debug, Clone)]
pub struct Provisioner {
    ctx: ProvisionContext,
    timing: RunTiming,
}

impl Provisioner {
    pub fn new(ctx: ProvisionContext, timing: RunTiming) -> Self {
        Self { ctx, timing }
    }

    #[must_use]
    pub fn timing(&self) -> RunTiming {
        self.timing
    }

    /// Reject definitions whose target environment has no backend.
    ///
    /// Entitle-only services are never created, so they need none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedEnvironment`] for the first
    /// offending service.
    pub fn preflight(&self, registry: &DefinitionRegistry) -> std::result::Result<(), ConfigError> {
        match registry
            .services()
            .iter()
            .filter(|service| !service.entitle_only)
            .find(|service| !self.ctx.backends.supports(service.target_environment))
        {
            Some(service) => Err(ConfigError::UnsupportedEnvironment(
                service.target_environment,
            )),
            None => Ok(()),
        }
    }

    /// Provision every definition in `registry` and return the aggregated
    /// metadata.
    ///
    /// Both loops stop once the tracker has resolved, a fatal error occurs,
    /// or `shutdown` turns true.
    ///
    /// # Errors
    ///
    /// - configuration errors from forest building and preflight, before any
    ///   external call
    /// - [`ProvisionError::SubscriptionFailed`] / [`ProvisionError::InstanceFailed`]
    ///   when the account reports a failed resource
    /// - [`ProvisionError::Timeout`] if the run did not converge in time
    /// - [`ProvisionError::Cancelled`] if `shutdown` fired first
    pub async fn provision(
        &self,
        registry: DefinitionRegistry,
        metadata: AccountMetadata,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ProvisionReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "provision",
            %run_id,
            subaccount = %self.ctx.account.subaccount_id
        );
        self.run(run_id, registry, metadata, shutdown)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: Uuid,
        registry: DefinitionRegistry,
        metadata: AccountMetadata,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ProvisionReport> {
        let started_at = Utc::now();
        let forest = DependencyForest::build(&registry)?;
        self.preflight(&registry)?;

        info!(
            applications = registry.applications().len(),
            services = registry.services().len(),
            roots = forest.roots().len(),
            interval_secs = self.timing.poll_interval.as_secs(),
            timeout_secs = self.timing.timeout.as_secs(),
            "Initiating app subscriptions and service instance creation"
        );

        let registry = Mutex::new(registry);
        let (stop_tx, stop_rx) = watch::channel(false);
        let orchestrator = CreationOrchestrator::new(&self.ctx, &forest);

        let orchestrate = async {
            let result = orchestrator
                .run_provisioning_loop(&registry, self.timing, stop_rx.clone())
                .await;
            if result.is_err() {
                let _ = stop_tx.send(true);
            }
            result
        };
        let track = async {
            let result =
                await_convergence(&self.ctx, &registry, metadata, self.timing, stop_rx.clone())
                    .await;
            let _ = stop_tx.send(true);
            result
        };
        let forward_shutdown = async {
            let mut finished = stop_rx.clone();
            tokio::select! {
                () = stopped(&mut shutdown) => {
                    warn!("Shutdown requested, stopping provisioning");
                    let _ = stop_tx.send(true);
                }
                () = stopped(&mut finished) => {}
            }
        };

        let (orchestrated, tracked, ()) = tokio::join!(orchestrate, track, forward_shutdown);

        let passes = orchestrated?;
        match tracked? {
            Convergence::Converged(metadata) => {
                let finished_at = Utc::now();
                info!(passes, "All service instances and app subscriptions are available");
                Ok(ProvisionReport {
                    run_id,
                    metadata,
                    registry: registry.into_inner(),
                    started_at,
                    finished_at,
                    passes,
                })
            }
            Convergence::TimedOut { elapsed } => Err(ProvisionError::Timeout {
                elapsed_secs: elapsed.as_secs(),
            }
            .into()),
            Convergence::Cancelled => Err(ProvisionError::Cancelled.into()),
        }
    }
}
