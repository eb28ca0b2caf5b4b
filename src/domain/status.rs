//! Externally reported status of subscriptions and service instances.

use std::fmt;

use serde_json::Value;

use super::ResourceDefinition;

/// Status label of a service instance whose creation has finished.
pub const CREATE_SUCCEEDED: &str = "create succeeded";

/// State of an app subscription as reported by the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    Subscribed,
    SubscribeFailed,
    InProcess,
    NotSubscribed,
    Other(String),
}

impl SubscriptionState {
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "SUBSCRIBED" => Self::Subscribed,
            "SUBSCRIBE_FAILED" => Self::SubscribeFailed,
            "IN_PROCESS" => Self::InProcess,
            "NOT_SUBSCRIBED" => Self::NotSubscribed,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subscribed => "SUBSCRIBED",
            Self::SubscribeFailed => "SUBSCRIBE_FAILED",
            Self::InProcess => "IN_PROCESS",
            Self::NotSubscribed => "NOT_SUBSCRIBED",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the account's subscription list.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub app_name: String,
    pub plan_name: Option<String>,
    pub state: SubscriptionState,
    pub tenant_id: Option<String>,
    /// The entry as returned by the account, kept for the metadata snapshot.
    pub raw: Value,
}

impl SubscriptionRecord {
    /// True if this entry describes the subscription `app` asks for.
    ///
    /// An app without a plan matches any plan of the same app.
    #[must_use]
    pub fn matches(&self, app: &ResourceDefinition) -> bool {
        self.app_name == app.name
            && app
                .plan
                .as_ref()
                .map_or(true, |plan| self.plan_name.as_ref() == Some(plan))
    }
}

/// Coarse lifecycle state of a service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Succeeded,
    InProgress,
    Failed,
    NotFound,
}

/// Status of a service instance as reported by its target environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStatus {
    pub state: InstanceState,
    /// Human readable label, e.g. "create succeeded".
    pub label: String,
    /// Raw response backing this status, if any.
    pub response: Option<Value>,
}

impl ServiceStatus {
    #[must_use]
    pub fn succeeded(response: Option<Value>) -> Self {
        Self {
            state: InstanceState::Succeeded,
            label: CREATE_SUCCEEDED.to_string(),
            response,
        }
    }

    #[must_use]
    pub fn in_progress(label: impl Into<String>, response: Option<Value>) -> Self {
        Self {
            state: InstanceState::InProgress,
            label: label.into(),
            response,
        }
    }

    #[must_use]
    pub fn failed(label: impl Into<String>, response: Option<Value>) -> Self {
        Self {
            state: InstanceState::Failed,
            label: label.into(),
            response,
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            state: InstanceState::NotFound,
            label: "not found".to_string(),
            response: None,
        }
    }

    /// Build a status from an operation type and state pair such as
    /// (`create`, `succeeded`) as reported by Cloud Foundry and the service
    /// manager.
    #[must_use]
    pub fn from_operation(operation: &str, state: &str, response: Option<Value>) -> Self {
        let label = format!("{operation} {state}");
        match state {
            "succeeded" if operation == "create" || operation == "update" => {
                Self::succeeded(response)
            }
            "failed" => Self::failed(label, response),
            _ => Self::in_progress(label, response),
        }
    }

    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.state == InstanceState::Succeeded
    }
}
