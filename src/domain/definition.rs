//! Resource definitions declared by a use case.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category tag of a definition.
///
/// Applications are subscribed to; services and elastic services get an
/// instance created in their target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Application,
    Service,
    ElasticService,
}

impl Category {
    /// True for categories that are provisioned as instances.
    #[must_use]
    pub const fn is_service(self) -> bool {
        matches!(self, Category::Service | Category::ElasticService)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Application => write!(f, "APPLICATION"),
            Category::Service => write!(f, "SERVICE"),
            Category::ElasticService => write!(f, "ELASTIC_SERVICE"),
        }
    }
}

/// Environment a definition is provisioned into.
///
/// Closed set; each variant is served by one backend looked up in
/// [`Backends`](crate::port::outbound::environment::Backends).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetEnvironment {
    #[default]
    #[serde(rename = "cloudfoundry")]
    CloudFoundry,
    #[serde(rename = "kymaruntime")]
    KymaRuntime,
    #[serde(rename = "sapbtp")]
    SapBtp,
}

impl TargetEnvironment {
    /// All supported environments.
    pub const ALL: [TargetEnvironment; 3] = [
        TargetEnvironment::CloudFoundry,
        TargetEnvironment::KymaRuntime,
        TargetEnvironment::SapBtp,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TargetEnvironment::CloudFoundry => "cloudfoundry",
            TargetEnvironment::KymaRuntime => "kymaruntime",
            TargetEnvironment::SapBtp => "sapbtp",
        }
    }
}

impl fmt::Display for TargetEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local view of how far a definition has been provisioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Triggered,
    Available,
    Failed,
}

impl ExecutionStatus {
    const fn rank(self) -> u8 {
        match self {
            ExecutionStatus::Pending => 0,
            ExecutionStatus::Triggered => 1,
            ExecutionStatus::Available => 2,
            ExecutionStatus::Failed => 3,
        }
    }

    /// True once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "PENDING"),
            ExecutionStatus::Triggered => write!(f, "TRIGGERED"),
            ExecutionStatus::Available => write!(f, "AVAILABLE"),
            ExecutionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// An application subscription or service instance to provision.
///
/// The declarative part (name, plan, dependencies, ...) comes from the use
/// case file. The status part is written by the control loops during a run
/// and ends up in the aggregated metadata snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default, alias = "requiredapplications")]
    pub required_applications: Vec<String>,
    #[serde(default, alias = "requiredservices")]
    pub required_services: Vec<String>,
    #[serde(default, alias = "entitleonly")]
    pub entitle_only: bool,
    #[serde(default, alias = "targetenvironment")]
    pub target_environment: TargetEnvironment,
    /// Name of the created instance; falls back to `name`.
    #[serde(default, alias = "instancename")]
    pub instance_name: Option<String>,
    /// Poll interval in seconds this service asks for while it is being created.
    #[serde(default, alias = "repeatstatusrequest")]
    pub repeat_status_request: Option<u64>,

    #[serde(default)]
    pub execution_status: ExecutionStatus,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_response: Option<Value>,
    #[serde(default)]
    pub success_info_shown: bool,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl ResourceDefinition {
    /// Create a definition with no dependencies and default settings.
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            plan: None,
            parameters: None,
            required_applications: Vec::new(),
            required_services: Vec::new(),
            entitle_only: false,
            target_environment: TargetEnvironment::default(),
            instance_name: None,
            repeat_status_request: None,
            execution_status: ExecutionStatus::Pending,
            status: None,
            status_response: None,
            success_info_shown: false,
            tenant_id: None,
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    #[must_use]
    pub fn with_target_environment(mut self, environment: TargetEnvironment) -> Self {
        self.target_environment = environment;
        self
    }

    #[must_use]
    pub fn requiring_applications<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_applications = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn requiring_services<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_services = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn entitle_only(mut self) -> Self {
        self.entitle_only = true;
        self
    }

    /// Name used for the created instance.
    #[must_use]
    pub fn instance_name(&self) -> &str {
        self.instance_name.as_deref().unwrap_or(&self.name)
    }

    /// True if `name` appears in either dependency list.
    #[must_use]
    pub fn requires(&self, name: &str) -> bool {
        self.required_applications.iter().any(|n| n == name)
            || self.required_services.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.execution_status == ExecutionStatus::Available
    }

    /// Move the execution status forward.
    ///
    /// Transitions only go PENDING → TRIGGERED → AVAILABLE, FAILED is
    /// reachable from anywhere and final. Anything else is ignored. Returns
    /// true if the status changed.
    pub fn advance(&mut self, next: ExecutionStatus) -> bool {
        if self.execution_status.is_terminal() || next.rank() <= self.execution_status.rank() {
            return false;
        }
        self.execution_status = next;
        true
    }
}
