//! `btp` CLI adapter.
//!
//! Serves app subscriptions for the whole account and acts as the backend of
//! the `sapbtp` environment: plain services become service manager
//! instances, elastic services become environment instances.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::runner::{parse_json, run_checked, CommandRunner, Invocation};
use crate::domain::{
    AccountContext, Category, ResourceDefinition, ServiceStatus, SubscriptionRecord,
    SubscriptionState, TargetEnvironment,
};
use crate::error::{ProvisionError, Result};
use crate::port::{EnvironmentBackend, SubscriptionService};

/// Adapter over the `btp` command line tool.
#[derive(Clone)]
pub struct BtpCli {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl BtpCli {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    fn command(&self) -> Invocation {
        Invocation::new(&self.program)
    }

    fn json_command(&self) -> Invocation {
        self.command().args(["--format", "json"])
    }

    async fn query(&self, invocation: Invocation) -> Result<Value> {
        let output = run_checked(self.runner.as_ref(), &invocation).await?;
        parse_json(&self.program, &output.stdout)
    }

    fn unexpected(&self, reason: impl Into<String>) -> ProvisionError {
        ProvisionError::UnexpectedResponse {
            program: self.program.clone(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Debug for BtpCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtpCli")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

fn parameters_json(def: &ResourceDefinition) -> Result<Option<String>> {
    def.parameters
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(Into::into)
}

fn subscription_record(entry: &Value) -> Option<SubscriptionRecord> {
    let text = |key: &str| entry.get(key).and_then(Value::as_str).map(ToString::to_string);
    Some(SubscriptionRecord {
        app_name: text("appName")?,
        plan_name: text("planName"),
        state: SubscriptionState::parse(&text("state")?),
        tenant_id: text("tenantId"),
        raw: entry.clone(),
    })
}

/// Environment type expected by `btp create accounts/environment-instance`.
fn environment_type(service: &str) -> &str {
    match service {
        "kymaruntime" => "kyma",
        other => other,
    }
}

/// Entries of a list response that is either a bare array or an object
/// holding the array under `key`.
fn entries<'a>(response: &'a Value, key: &str) -> &'a [Value] {
    response
        .as_array()
        .or_else(|| response.get(key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn service_instance_status(entry: &Value) -> ServiceStatus {
    let operation = entry.get("last_operation").or_else(|| entry.get("lastOperation"));
    let field = |key: &str| {
        operation
            .and_then(|op| op.get(key))
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
    };
    match (field("type"), field("state")) {
        (Some(kind), Some(state)) => {
            ServiceStatus::from_operation(&kind, &state, Some(entry.clone()))
        }
        _ if entry.get("ready").and_then(Value::as_bool) == Some(true) => {
            ServiceStatus::succeeded(Some(entry.clone()))
        }
        _ => ServiceStatus::in_progress("create in progress", Some(entry.clone())),
    }
}

fn environment_instance_status(entry: &Value) -> ServiceStatus {
    let state = entry.get("state").and_then(Value::as_str).unwrap_or_default();
    match state {
        "OK" => ServiceStatus::succeeded(Some(entry.clone())),
        failed if failed.ends_with("FAILED") => {
            ServiceStatus::failed("create failed", Some(entry.clone()))
        }
        _ => ServiceStatus::in_progress("create in progress", Some(entry.clone())),
    }
}

#[async_trait]
impl SubscriptionService for BtpCli {
    async fn subscribe_app(&self, ctx: &AccountContext, app: &ResourceDefinition) -> Result<()> {
        let parameters = parameters_json(app)?;
        let invocation = self
            .command()
            .args(["subscribe", "accounts/subaccount"])
            .args(["--subaccount", ctx.subaccount_id.as_str()])
            .args(["--to-app", app.name.as_str()])
            .opt("--plan", app.plan.as_deref())
            .opt("--parameters", parameters.as_deref());

        run_checked(self.runner.as_ref(), &invocation).await?;
        info!(app = %app.name, plan = ?app.plan, "Subscription triggered");
        Ok(())
    }

    async fn is_app_subscribed(
        &self,
        ctx: &AccountContext,
        app_name: &str,
        plan: Option<&str>,
    ) -> Result<bool> {
        let invocation = self
            .json_command()
            .args(["get", "accounts/subscription"])
            .args(["--subaccount", ctx.subaccount_id.as_str()])
            .args(["--of-app", app_name])
            .opt("--plan", plan);

        let response = self.query(invocation).await?;
        let subscribed = response.get("state").and_then(Value::as_str) == Some("SUBSCRIBED");
        debug!(app = app_name, subscribed, "Checked subscription");
        Ok(subscribed)
    }

    async fn list_subscriptions(&self, ctx: &AccountContext) -> Result<Vec<SubscriptionRecord>> {
        let invocation = self
            .json_command()
            .args(["list", "accounts/subscription"])
            .args(["--subaccount", ctx.subaccount_id.as_str()]);

        let response = self.query(invocation).await?;
        let applications = response
            .get("applications")
            .and_then(Value::as_array)
            .ok_or_else(|| self.unexpected("missing 'applications' list"))?;
        Ok(applications.iter().filter_map(subscription_record).collect())
    }
}

#[async_trait]
impl EnvironmentBackend for BtpCli {
    fn environment(&self) -> TargetEnvironment {
        TargetEnvironment::SapBtp
    }

    async fn create_instance(
        &self,
        ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<()> {
        let parameters = parameters_json(service)?;
        let invocation = match service.category {
            Category::ElasticService => self
                .command()
                .args(["create", "accounts/environment-instance"])
                .args(["--subaccount", ctx.subaccount_id.as_str()])
                .args(["--environment", environment_type(&service.name)])
                .args(["--service", service.name.as_str()])
                .opt("--plan", service.plan.as_deref())
                .args(["--display-name", service.instance_name()])
                .opt("--parameters", parameters.as_deref()),
            _ => self
                .command()
                .args(["create", "services/instance"])
                .args(["--subaccount", ctx.subaccount_id.as_str()])
                .args(["--name", service.instance_name()])
                .args(["--offering-name", service.name.as_str()])
                .opt("--plan-name", service.plan.as_deref())
                .opt("--parameters", parameters.as_deref()),
        };

        run_checked(self.runner.as_ref(), &invocation).await?;
        Ok(())
    }

    async fn instance_status(
        &self,
        ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<ServiceStatus> {
        let elastic = service.category == Category::ElasticService;
        let (resource, key) = if elastic {
            ("accounts/environment-instance", "environmentInstances")
        } else {
            ("services/instance", "items")
        };
        let invocation = self
            .json_command()
            .args(["list", resource])
            .args(["--subaccount", ctx.subaccount_id.as_str()]);

        let response = self.query(invocation).await?;
        let entry = entries(&response, key).iter().find(|entry| {
            entry.get("name").and_then(Value::as_str) == Some(service.instance_name())
        });

        Ok(match entry {
            None => ServiceStatus::not_found(),
            Some(entry) if elastic => environment_instance_status(entry),
            Some(entry) => service_instance_status(entry),
        })
    }
}
