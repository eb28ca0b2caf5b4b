//! `cf` CLI adapter, backend of the `cloudfoundry` environment.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::runner::{parse_json, run_checked, CommandRunner, Invocation};
use crate::domain::{AccountContext, ResourceDefinition, ServiceStatus, TargetEnvironment};
use crate::error::{ConfigError, ProvisionError, Result};
use crate::port::EnvironmentBackend;

/// Creates and inspects service instances in the targeted Cloud Foundry
/// space.
#[derive(Clone)]
pub struct CfCli {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl CfCli {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

impl std::fmt::Debug for CfCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CfCli")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EnvironmentBackend for CfCli {
    fn environment(&self) -> TargetEnvironment {
        TargetEnvironment::CloudFoundry
    }

    async fn create_instance(
        &self,
        _ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<()> {
        let plan = service
            .plan
            .as_deref()
            .ok_or(ConfigError::MissingField { field: "plan" })?;
        let parameters = service
            .parameters
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let invocation = Invocation::new(&self.program)
            .arg("create-service")
            .args([service.name.as_str(), plan, service.instance_name()])
            .opt("-c", parameters.as_deref());

        run_checked(self.runner.as_ref(), &invocation).await?;
        Ok(())
    }

    async fn instance_status(
        &self,
        _ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<ServiceStatus> {
        let invocation = Invocation::new(&self.program).arg("curl").arg(format!(
            "/v3/service_instances?names={}",
            service.instance_name()
        ));
        let output = run_checked(self.runner.as_ref(), &invocation).await?;
        let response = parse_json(&self.program, &output.stdout)?;

        let resources = response
            .get("resources")
            .and_then(Value::as_array)
            .ok_or_else(|| ProvisionError::UnexpectedResponse {
                program: self.program.clone(),
                reason: "missing 'resources' list".to_string(),
            })?;
        let Some(instance) = resources.first() else {
            return Ok(ServiceStatus::not_found());
        };

        let operation = instance.get("last_operation");
        let field = |key: &str| {
            operation
                .and_then(|op| op.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
        };
        Ok(ServiceStatus::from_operation(
            field("type"),
            field("state"),
            Some(instance.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Category, InstanceState};
    use crate::error::Error;
    use crate::testkit::runner::ScriptedRunner;

    fn ctx() -> AccountContext {
        AccountContext::new("sub-1")
    }

    #[tokio::test]
    async fn create_service_passes_parameters_as_json() {
        let runner = Arc::new(ScriptedRunner::new());
        let mut xsuaa = ResourceDefinition::new("xsuaa", Category::Service).with_plan("application");
        xsuaa.instance_name = Some("my-xsuaa".into());
        xsuaa.parameters = Some(serde_json::from_value(json!({"xsappname": "demo"})).unwrap());

        CfCli::new(runner.clone(), "cf")
            .create_instance(&ctx(), &xsuaa)
            .await
            .unwrap();

        assert_eq!(
            runner.calls()[0].args,
            vec!["create-service", "xsuaa", "application", "my-xsuaa", "-c", r#"{"xsappname":"demo"}"#]
        );
    }

    #[tokio::test]
    async fn create_without_plan_is_a_configuration_error() {
        let runner = Arc::new(ScriptedRunner::new());
        let result = CfCli::new(runner.clone(), "cf")
            .create_instance(&ctx(), &ResourceDefinition::new("xsuaa", Category::Service))
            .await;

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingField { field: "plan" }))
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn status_follows_last_operation() {
        let runner = Arc::new(ScriptedRunner::new().with_stdout([
            r#"{"resources": []}"#,
            r#"{"resources": [{"name": "xsuaa", "last_operation": {"type": "create", "state": "in progress"}}]}"#,
            r#"{"resources": [{"name": "xsuaa", "last_operation": {"type": "create", "state": "succeeded"}}]}"#,
        ]));
        let cf = CfCli::new(runner.clone(), "cf");
        let xsuaa = ResourceDefinition::new("xsuaa", Category::Service);

        let missing = cf.instance_status(&ctx(), &xsuaa).await.unwrap();
        let creating = cf.instance_status(&ctx(), &xsuaa).await.unwrap();
        let done = cf.instance_status(&ctx(), &xsuaa).await.unwrap();

        assert_eq!(missing.state, InstanceState::NotFound);
        assert_eq!(creating.label, "create in progress");
        assert!(done.is_succeeded());
        assert_eq!(runner.calls()[0].args[1], "/v3/service_instances?names=xsuaa");
    }
}
