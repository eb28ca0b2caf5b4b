//! Status tracker and convergence loop.
//!
//! Polls the subscription list and the instance status of every service,
//! writes what it sees back into the registry, and decides when the whole
//! run has converged.

use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::context::{absorb_transient, ProvisionContext};
use super::instance::get_service_status;
use super::pause::{pause, Pause};
use crate::domain::status::CREATE_SUCCEEDED;
use crate::domain::{
    aggregate, AccountMetadata, DefinitionRegistry, ExecutionStatus, InstanceState, RunTiming,
    SubscriptionState,
};
use crate::error::{ProvisionError, Result};

/// How a convergence loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Convergence {
    /// Everything is available; carries the aggregated metadata.
    Converged(AccountMetadata),
    /// The run timeout elapsed first.
    TimedOut { elapsed: Duration },
    /// The stop signal fired first.
    Cancelled,
}

/// Pause before the next status cycle.
///
/// The largest of `base` and the interval requested by any service that has
/// not reported "create succeeded" yet.
#[must_use]
pub fn determine_poll_interval(registry: &DefinitionRegistry, base: Duration) -> Duration {
    registry
        .services()
        .iter()
        .filter(|service| service.status.as_deref() != Some(CREATE_SUCCEEDED))
        .filter_map(|service| service.repeat_status_request)
        .map(Duration::from_secs)
        .fold(base, Duration::max)
}

/// Refresh every app subscription from the account's subscription list.
///
/// Returns true once every application (entitle-only ones excepted) is
/// reported SUBSCRIBED. An application missing from the list counts as not
/// available.
///
/// # Errors
///
/// Returns [`ProvisionError::SubscriptionFailed`] as soon as an application
/// is reported SUBSCRIBE_FAILED. A failing list call is returned as is.
pub async fn check_all_subscriptions_available(
    ctx: &ProvisionContext,
    registry: &mut DefinitionRegistry,
) -> Result<bool> {
    let records = ctx.subscriptions.list_subscriptions(&ctx.account).await?;
    let mut all_available = true;

    for app in registry.applications_mut() {
        if app.entitle_only || app.success_info_shown {
            continue;
        }
        let Some(record) = records.iter().find(|record| record.matches(&*app)) else {
            debug!(app = %app.name, plan = ?app.plan, "No subscription reported yet");
            all_available = false;
            continue;
        };

        app.status = Some(record.state.to_string());
        app.status_response = Some(record.raw.clone());

        match record.state {
            SubscriptionState::Subscribed => {
                app.tenant_id.clone_from(&record.tenant_id);
                app.advance(ExecutionStatus::Available);
                app.success_info_shown = true;
                info!(app = %app.name, plan = ?app.plan, "Subscription is now available");
            }
            SubscriptionState::SubscribeFailed => {
                app.advance(ExecutionStatus::Failed);
                error!(app = %app.name, "Account reported that the subscription has failed");
                return Err(ProvisionError::SubscriptionFailed {
                    app: app.name.clone(),
                }
                .into());
            }
            _ => {
                all_available = false;
                debug!(app = %app.name, state = %record.state, "Subscription not yet available");
            }
        }
    }

    Ok(all_available)
}

/// Refresh the status of every service instance.
///
/// Returns true once every service (entitle-only ones excepted) reports
/// "create succeeded". `interval` is only reported in the log.
///
/// # Errors
///
/// Returns [`ProvisionError::InstanceFailed`] as soon as an instance reports
/// a failed creation, and configuration errors from backend lookup.
/// Transient status read failures count as "not yet created".
pub async fn check_all_service_instances_created(
    ctx: &ProvisionContext,
    registry: &mut DefinitionRegistry,
    interval: Duration,
) -> Result<bool> {
    let mut all_created = true;

    for service in registry.services_mut() {
        if service.entitle_only || service.success_info_shown {
            continue;
        }
        let read = get_service_status(ctx, service).await;
        let Some(status) = absorb_transient(read, &service.name, "read status")? else {
            all_created = false;
            continue;
        };

        service.status = Some(status.label.clone());
        service.status_response = status.response;

        match status.state {
            InstanceState::Succeeded => {
                service.advance(ExecutionStatus::Available);
                service.success_info_shown = true;
                info!(
                    service = %service.name,
                    instance = service.instance_name(),
                    "Service instance is now available"
                );
            }
            InstanceState::Failed => {
                service.advance(ExecutionStatus::Failed);
                error!(service = %service.name, status = %status.label, "Service instance creation has failed");
                return Err(ProvisionError::InstanceFailed {
                    service: service.name.clone(),
                }
                .into());
            }
            InstanceState::InProgress | InstanceState::NotFound => {
                all_created = false;
                info!(
                    service = %service.name,
                    status = %status.label,
                    next_check_secs = interval.as_secs(),
                    "Service instance not yet available"
                );
            }
        }
    }

    Ok(all_created)
}

/// Poll until everything is available, the timeout elapses, or `stop` fires.
///
/// On convergence the registry is aggregated into `metadata` exactly once.
/// The registry lock is held for each status cycle.
///
/// # Errors
///
/// Returns the first fatal error raised by a status check.
pub async fn await_convergence(
    ctx: &ProvisionContext,
    registry: &Mutex<DefinitionRegistry>,
    metadata: AccountMetadata,
    timing: RunTiming,
    mut stop: watch::Receiver<bool>,
) -> Result<Convergence> {
    let started = Instant::now();
    let mut cycles = 0u32;

    while started.elapsed() < timing.timeout {
        if *stop.borrow() {
            return Ok(Convergence::Cancelled);
        }

        let interval = {
            let mut registry = registry.lock().await;
            let interval = determine_poll_interval(&registry, timing.poll_interval);

            let services_ready = !registry.has_services()
                || check_all_service_instances_created(ctx, &mut registry, interval).await?;
            let apps_ready = !registry.has_applications()
                || match check_all_subscriptions_available(ctx, &mut registry).await {
                    Ok(ready) => ready,
                    Err(err) if !err.is_fatal() => {
                        debug!(error = %err, "Subscription list unavailable, retrying");
                        false
                    }
                    Err(err) => return Err(err),
                };
            cycles += 1;

            if services_ready && apps_ready {
                info!(cycles, "All service instances and subscriptions are now available");
                let metadata = aggregate(&registry, metadata)?;
                return Ok(Convergence::Converged(metadata));
            }
            interval
        };

        if pause(interval, &mut stop).await == Pause::Stopped {
            return Ok(Convergence::Cancelled);
        }
    }

    let elapsed = started.elapsed();
    error!(
        cycles,
        elapsed_secs = elapsed.as_secs(),
        "Could not get all services and app subscriptions up and running"
    );
    Ok(Convergence::TimedOut { elapsed })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::metadata::{CREATED_APP_SUBSCRIPTIONS, CREATED_SERVICE_INSTANCES};
    use crate::domain::{DefinitionId, ServiceStatus, TargetEnvironment};
    use crate::error::Error;
    use crate::port::Backends;
    use crate::testkit::domain::{account_metadata, app, context, registry, service};
    use crate::testkit::fakes::{FakeBackend, FakeSubscriptions};

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn poll_interval_stretches_for_slow_services() {
        let mut slow = service("hana");
        slow.repeat_status_request = Some(30);
        let mut done = service("kyma");
        done.repeat_status_request = Some(120);
        done.status = Some(CREATE_SUCCEEDED.to_string());
        let reg = registry(vec![], vec![service("xsuaa"), slow, done]);

        assert_eq!(determine_poll_interval(&reg, secs(4)), secs(30));
        assert_eq!(determine_poll_interval(&reg, secs(60)), secs(60));
    }

    #[tokio::test]
    async fn subscribe_failed_aborts_immediately() {
        let subscriptions = Arc::new(
            FakeSubscriptions::new().with_existing("audit", SubscriptionState::SubscribeFailed),
        );
        let ctx = context(subscriptions, Backends::new());
        let mut reg = registry(vec![app("audit")], vec![]);

        let result = check_all_subscriptions_available(&ctx, &mut reg).await;

        assert!(matches!(
            result,
            Err(Error::Provision(ProvisionError::SubscriptionFailed { ref app })) if app == "audit"
        ));
        let audit = reg.get(DefinitionId::application(0)).unwrap();
        assert_eq!(audit.execution_status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn subscription_fields_are_updated() {
        let subscriptions = Arc::new(
            FakeSubscriptions::new()
                .with_existing("workzone", SubscriptionState::Subscribed)
                .with_existing("audit", SubscriptionState::InProcess),
        );
        let ctx = context(subscriptions, Backends::new());
        let mut reg = registry(vec![app("workzone"), app("audit")], vec![]);

        let ready = check_all_subscriptions_available(&ctx, &mut reg).await.unwrap();

        assert!(!ready);
        let workzone = reg.get(DefinitionId::application(0)).unwrap();
        assert_eq!(workzone.execution_status, ExecutionStatus::Available);
        assert_eq!(workzone.status.as_deref(), Some("SUBSCRIBED"));
        assert_eq!(workzone.tenant_id.as_deref(), Some("tenant-workzone"));
        assert!(workzone.success_info_shown);
        let audit = reg.get(DefinitionId::application(1)).unwrap();
        assert_eq!(audit.status.as_deref(), Some("IN_PROCESS"));
        assert!(!audit.success_info_shown);
    }

    #[tokio::test]
    async fn available_subscription_is_not_revisited() {
        let subscriptions = Arc::new(
            FakeSubscriptions::new()
                .with_existing("workzone", SubscriptionState::Subscribed)
                .with_progress("workzone", [SubscriptionState::InProcess]),
        );
        let ctx = context(subscriptions.clone(), Backends::new());
        let mut reg = registry(vec![app("workzone")], vec![]);

        assert!(check_all_subscriptions_available(&ctx, &mut reg).await.unwrap());
        let first = reg.get(DefinitionId::application(0)).unwrap().clone();
        assert!(first.success_info_shown);

        // The account now lists the app as IN_PROCESS; the recorded success stands.
        assert!(check_all_subscriptions_available(&ctx, &mut reg).await.unwrap());
        assert_eq!(subscriptions.list_count(), 2);
        let workzone = reg.get(DefinitionId::application(0)).unwrap();
        assert_eq!(workzone.status.as_deref(), Some("SUBSCRIBED"));
        assert_eq!(workzone.status_response, first.status_response);
        assert_eq!(workzone.execution_status, ExecutionStatus::Available);
    }

    #[tokio::test]
    async fn missing_subscription_is_not_available() {
        let ctx = context(Arc::new(FakeSubscriptions::new()), Backends::new());
        let mut reg = registry(vec![app("workzone")], vec![]);

        assert!(!check_all_subscriptions_available(&ctx, &mut reg).await.unwrap());
    }

    #[tokio::test]
    async fn entitle_only_definitions_do_not_block() {
        let ctx = context(
            Arc::new(FakeSubscriptions::new()),
            Backends::new().with(Arc::new(FakeBackend::new(TargetEnvironment::CloudFoundry))),
        );
        let mut reg = registry(
            vec![app("workzone").entitle_only()],
            vec![service("hana").entitle_only()],
        );

        assert!(check_all_subscriptions_available(&ctx, &mut reg).await.unwrap());
        assert!(check_all_service_instances_created(&ctx, &mut reg, secs(4))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn failed_instance_aborts() {
        let backend = FakeBackend::new(TargetEnvironment::CloudFoundry)
            .with_existing("xsuaa", ServiceStatus::failed("create failed", None));
        let ctx = context(
            Arc::new(FakeSubscriptions::new()),
            Backends::new().with(Arc::new(backend)),
        );
        let mut reg = registry(vec![], vec![service("xsuaa")]);

        let result = check_all_service_instances_created(&ctx, &mut reg, secs(4)).await;

        assert!(matches!(
            result,
            Err(Error::Provision(ProvisionError::InstanceFailed { .. }))
        ));
        let xsuaa = reg.get(DefinitionId::service(0)).unwrap();
        assert_eq!(xsuaa.status.as_deref(), Some("create failed"));
        assert_eq!(xsuaa.execution_status, ExecutionStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn converges_and_aggregates_once() {
        let backend = FakeBackend::new(TargetEnvironment::CloudFoundry).with_existing(
            "xsuaa",
            ServiceStatus::in_progress("create in progress", None),
        );
        let backend = Arc::new(backend.with_progress("xsuaa", [ServiceStatus::succeeded(None)]));
        let subscriptions = Arc::new(
            FakeSubscriptions::new().with_existing("workzone", SubscriptionState::Subscribed),
        );
        let ctx = context(subscriptions, Backends::new().with(backend));
        let reg = Mutex::new(registry(vec![app("workzone")], vec![service("xsuaa")]));
        let (_tx, rx) = watch::channel(false);
        let timing = RunTiming::new(secs(5), secs(60));

        let outcome = await_convergence(&ctx, &reg, account_metadata(), timing, rx)
            .await
            .unwrap();

        let Convergence::Converged(metadata) = outcome else {
            panic!("expected convergence, got {outcome:?}");
        };
        assert_eq!(metadata.list(CREATED_SERVICE_INSTANCES).len(), 1);
        assert_eq!(metadata.list(CREATED_APP_SUBSCRIPTIONS).len(), 1);
        assert_eq!(
            metadata.list(CREATED_SERVICE_INSTANCES)[0]["status"],
            CREATE_SUCCEEDED
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_an_explicit_outcome() {
        let ctx = context(Arc::new(FakeSubscriptions::new()), Backends::new());
        let reg = Mutex::new(registry(vec![app("never")], vec![]));
        let (_tx, rx) = watch::channel(false);
        let timing = RunTiming::new(secs(10), secs(30));

        let outcome = await_convergence(&ctx, &reg, account_metadata(), timing, rx)
            .await
            .unwrap();

        assert!(matches!(outcome, Convergence::TimedOut { elapsed } if elapsed >= secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_registry_converges_immediately() {
        let ctx = context(Arc::new(FakeSubscriptions::new()), Backends::new());
        let reg = Mutex::new(DefinitionRegistry::default());
        let (_tx, rx) = watch::channel(false);

        let outcome = await_convergence(
            &ctx,
            &reg,
            account_metadata(),
            RunTiming::new(secs(1), secs(10)),
            rx,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, Convergence::Converged(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_cancels() {
        let ctx = context(Arc::new(FakeSubscriptions::new()), Backends::new());
        let reg = Mutex::new(registry(vec![app("never")], vec![]));
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(secs(15)).await;
            let _ = tx.send(true);
        });

        let outcome = await_convergence(
            &ctx,
            &reg,
            account_metadata(),
            RunTiming::new(secs(10), secs(3600)),
            rx,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Convergence::Cancelled);
    }
}
