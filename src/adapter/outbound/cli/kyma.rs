//! `kubectl` adapter, backend of the `kymaruntime` environment.
//!
//! Instances are `ServiceInstance` resources of the SAP BTP service operator,
//! applied from a JSON manifest on stdin.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::runner::{parse_json, run_checked, CommandRunner, Invocation};
use crate::domain::{AccountContext, ResourceDefinition, ServiceStatus, TargetEnvironment};
use crate::error::Result;
use crate::port::EnvironmentBackend;

const SERVICE_INSTANCE_RESOURCE: &str = "serviceinstances.services.cloud.sap.com";

/// Creates and inspects `ServiceInstance` resources in the current
/// kubeconfig context.
#[derive(Clone)]
pub struct KymaCli {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl KymaCli {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

impl std::fmt::Debug for KymaCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KymaCli")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

fn manifest(service: &ResourceDefinition) -> Value {
    let mut spec = json!({ "serviceOfferingName": service.name });
    if let Some(plan) = &service.plan {
        spec["servicePlanName"] = json!(plan);
    }
    if let Some(parameters) = &service.parameters {
        spec["parameters"] = Value::Object(parameters.clone());
    }
    json!({
        "apiVersion": "services.cloud.sap.com/v1",
        "kind": "ServiceInstance",
        "metadata": { "name": service.instance_name() },
        "spec": spec,
    })
}

fn condition_is_true(resource: &Value, kind: &str) -> bool {
    resource
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|condition| {
            condition.get("type").and_then(Value::as_str) == Some(kind)
                && condition.get("status").and_then(Value::as_str) == Some("True")
        })
}

#[async_trait]
impl EnvironmentBackend for KymaCli {
    fn environment(&self) -> TargetEnvironment {
        TargetEnvironment::KymaRuntime
    }

    async fn create_instance(
        &self,
        _ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<()> {
        let body = serde_json::to_string(&manifest(service))?;
        let invocation = Invocation::new(&self.program)
            .args(["apply", "-f", "-"])
            .stdin(body);

        run_checked(self.runner.as_ref(), &invocation).await?;
        Ok(())
    }

    async fn instance_status(
        &self,
        _ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<ServiceStatus> {
        let invocation = Invocation::new(&self.program)
            .args(["get", SERVICE_INSTANCE_RESOURCE, service.instance_name()])
            .args(["-o", "json", "--ignore-not-found"]);
        let output = run_checked(self.runner.as_ref(), &invocation).await?;

        if output.stdout.trim().is_empty() {
            return Ok(ServiceStatus::not_found());
        }
        let resource = parse_json(&self.program, &output.stdout)?;

        Ok(if condition_is_true(&resource, "Failed") {
            ServiceStatus::failed("create failed", Some(resource))
        } else if condition_is_true(&resource, "Ready") || condition_is_true(&resource, "Succeeded")
        {
            ServiceStatus::succeeded(Some(resource))
        } else {
            ServiceStatus::in_progress("create in progress", Some(resource))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, InstanceState};
    use crate::testkit::runner::ScriptedRunner;

    fn ctx() -> AccountContext {
        AccountContext::new("sub-1")
    }

    #[tokio::test]
    async fn applies_manifest_from_stdin() {
        let runner = Arc::new(ScriptedRunner::new());
        let redis = ResourceDefinition::new("redis-cache", Category::Service).with_plan("standard");

        KymaCli::new(runner.clone(), "kubectl")
            .create_instance(&ctx(), &redis)
            .await
            .unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call.args, vec!["apply", "-f", "-"]);
        let sent: Value = serde_json::from_str(call.stdin.as_deref().unwrap()).unwrap();
        assert_eq!(sent["kind"], "ServiceInstance");
        assert_eq!(sent["metadata"]["name"], "redis-cache");
        assert_eq!(sent["spec"]["servicePlanName"], "standard");
    }

    #[tokio::test]
    async fn conditions_map_to_instance_state() {
        let runner = Arc::new(ScriptedRunner::new().with_stdout([
            "",
            r#"{"status": {"conditions": [{"type": "Succeeded", "status": "False"}]}}"#,
            r#"{"status": {"conditions": [{"type": "Ready", "status": "True"}]}}"#,
            r#"{"status": {"conditions": [{"type": "Failed", "status": "True"}]}}"#,
        ]));
        let kubectl = KymaCli::new(runner.clone(), "kubectl");
        let redis = ResourceDefinition::new("redis-cache", Category::Service);

        let mut states = Vec::new();
        for _ in 0..4 {
            states.push(kubectl.instance_status(&ctx(), &redis).await.unwrap().state);
        }

        assert_eq!(
            states,
            vec![
                InstanceState::NotFound,
                InstanceState::InProgress,
                InstanceState::Succeeded,
                InstanceState::Failed
            ]
        );
    }
}
