//! Eligibility predicate shared by the orchestrator.

use tracing::trace;

use super::context::ProvisionContext;
use super::instance::get_service_status;
use crate::domain::{DefinitionId, DefinitionRegistry, DependencyForest, Kind, NodeId};
use crate::error::Result;

/// True if every direct prerequisite of `node` is AVAILABLE.
///
/// Leaves are vacuously eligible. Only local execution status is consulted.
#[must_use]
pub fn prerequisites_available(
    forest: &DependencyForest,
    registry: &DefinitionRegistry,
    node: NodeId,
) -> bool {
    forest.children(node).iter().all(|&child| {
        registry
            .get(forest.definition(child))
            .is_some_and(|def| def.is_available())
    })
}

/// Decide whether `target` may be triggered now.
///
/// A definition that is not reachable in `forest` is never eligible. For a
/// node with prerequisites the current external status of the target itself
/// is read as well, but the decision rests on the prerequisites alone.
///
/// # Errors
///
/// Only fatal errors from that status read are returned; transient ones are
/// ignored.
pub async fn can_trigger(
    ctx: &ProvisionContext,
    forest: &DependencyForest,
    registry: &DefinitionRegistry,
    target: DefinitionId,
) -> Result<bool> {
    let Some(node) = forest.locate(target) else {
        return Ok(false);
    };
    if forest.children(node).is_empty() {
        return Ok(true);
    }

    if let Some(def) = registry.get(target) {
        let observed = match target.kind() {
            Kind::Service => get_service_status(ctx, def)
                .await
                .map(|status| status.label),
            Kind::Application => ctx
                .subscriptions
                .is_app_subscribed(&ctx.account, &def.name, def.plan.as_deref())
                .await
                .map(|subscribed| subscribed.to_string()),
        };
        match observed {
            Ok(status) => trace!(definition = %def.name, status, "Observed status before eligibility check"),
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => {}
        }
    }

    Ok(prerequisites_available(forest, registry, node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionStatus, TargetEnvironment};
    use crate::error::{ConfigError, Error};
    use crate::testkit::domain::{app, context, registry, service};
    use crate::testkit::fakes::{FakeBackend, FakeSubscriptions};
    use crate::port::Backends;
    use std::sync::Arc;

    fn cf_context() -> ProvisionContext {
        let backends =
            Backends::new().with(Arc::new(FakeBackend::new(TargetEnvironment::CloudFoundry)));
        context(Arc::new(FakeSubscriptions::new()), backends)
    }

    #[tokio::test]
    async fn leaf_is_eligible_immediately() {
        let reg = registry(vec![app("a")], vec![]);
        let forest = DependencyForest::build(&reg).unwrap();

        let eligible = can_trigger(&cf_context(), &forest, &reg, DefinitionId::application(0))
            .await
            .unwrap();
        assert!(eligible);
    }

    #[tokio::test]
    async fn eligibility_follows_every_child() {
        let mut reg = registry(
            vec![app("a"), app("b"), app("c").requiring_applications(["a", "b"])],
            vec![],
        );
        let forest = DependencyForest::build(&reg).unwrap();
        let ctx = cf_context();
        let c = DefinitionId::application(2);

        assert!(!can_trigger(&ctx, &forest, &reg, c).await.unwrap());

        reg.get_mut(DefinitionId::application(0))
            .unwrap()
            .advance(ExecutionStatus::Available);
        assert!(!can_trigger(&ctx, &forest, &reg, c).await.unwrap());

        reg.get_mut(DefinitionId::application(1))
            .unwrap()
            .advance(ExecutionStatus::Available);
        assert!(can_trigger(&ctx, &forest, &reg, c).await.unwrap());
    }

    #[test]
    fn child_leaving_available_makes_parent_ineligible() {
        let mut reg = registry(vec![app("a"), app("b").requiring_applications(["a"])], vec![]);
        let forest = DependencyForest::build(&reg).unwrap();
        let b = forest.locate(DefinitionId::application(1)).unwrap();

        reg.get_mut(DefinitionId::application(0)).unwrap().execution_status =
            ExecutionStatus::Available;
        assert!(prerequisites_available(&forest, &reg, b));

        reg.get_mut(DefinitionId::application(0)).unwrap().execution_status =
            ExecutionStatus::Triggered;
        assert!(!prerequisites_available(&forest, &reg, b));
    }

    #[tokio::test]
    async fn unreachable_definition_is_never_eligible() {
        let reg = registry(
            vec![],
            vec![
                service("x").requiring_services(["y"]),
                service("y").requiring_services(["x"]),
            ],
        );
        let forest = DependencyForest::build(&reg).unwrap();

        let eligible = can_trigger(&cf_context(), &forest, &reg, DefinitionId::service(0))
            .await
            .unwrap();
        assert!(!eligible);
    }

    #[tokio::test]
    async fn unsupported_environment_in_status_read_is_fatal() {
        let reg = registry(
            vec![],
            vec![
                service("db"),
                service("api")
                    .requiring_services(["db"])
                    .with_target_environment(TargetEnvironment::KymaRuntime),
            ],
        );
        let forest = DependencyForest::build(&reg).unwrap();

        let result = can_trigger(&cf_context(), &forest, &reg, DefinitionId::service(1)).await;
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::UnsupportedEnvironment(
                TargetEnvironment::KymaRuntime
            )))
        ));
    }

    #[tokio::test]
    async fn transient_status_failure_is_ignored() {
        let backend = FakeBackend::new(TargetEnvironment::CloudFoundry).with_status_failures(1);
        let ctx = context(
            Arc::new(FakeSubscriptions::new()),
            Backends::new().with(Arc::new(backend)),
        );
        let mut reg = registry(vec![], vec![service("db"), service("api").requiring_services(["db"])]);
        reg.get_mut(DefinitionId::service(0))
            .unwrap()
            .advance(ExecutionStatus::Available);
        let forest = DependencyForest::build(&reg).unwrap();

        assert!(can_trigger(&ctx, &forest, &reg, DefinitionId::service(1)).await.unwrap());
    }
}
