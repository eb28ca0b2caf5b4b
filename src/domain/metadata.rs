//! Account metadata and the one-time aggregation of provisioned definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::DefinitionRegistry;
use crate::error::ConfigError;

/// Key holding the snapshots of provisioned service instances.
pub const CREATED_SERVICE_INSTANCES: &str = "createdServiceInstances";

/// Key holding the snapshots of provisioned app subscriptions.
pub const CREATED_APP_SUBSCRIPTIONS: &str = "createdAppSubscriptions";

const SUBACCOUNT_ID: &str = "subaccountid";

/// Free-form JSON metadata describing the target account.
///
/// The provisioner only reads `subaccountid` and appends to the two
/// `created*` lists; every other key passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountMetadata(Map<String, Value>);

impl AccountMetadata {
    #[must_use]
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Subaccount the run provisions into.
    #[must_use]
    pub fn subaccount_id(&self) -> Option<&str> {
        self.0.get(SUBACCOUNT_ID).and_then(Value::as_str)
    }

    #[must_use]
    pub fn with_subaccount_id(mut self, id: impl Into<String>) -> Self {
        self.0.insert(SUBACCOUNT_ID.to_string(), Value::String(id.into()));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Snapshots recorded under `key`, or an empty slice.
    #[must_use]
    pub fn list(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn list_mut(&mut self, key: &str) -> &mut Vec<Value> {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            warn!(key, "Metadata entry is not a list, keeping it as first element");
            let previous = entry.take();
            *entry = Value::Array(vec![previous]);
        }
        match entry {
            Value::Array(list) => list,
            _ => unreachable!("entry was just made an array"),
        }
    }
}

/// Account the collaborators act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub subaccount_id: String,
}

impl AccountContext {
    pub fn new(subaccount_id: impl Into<String>) -> Self {
        Self {
            subaccount_id: subaccount_id.into(),
        }
    }

    /// Read the context from account metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] if `subaccountid` is absent or empty.
    pub fn from_metadata(metadata: &AccountMetadata) -> Result<Self, ConfigError> {
        match metadata.subaccount_id() {
            Some(id) if !id.trim().is_empty() => Ok(Self::new(id)),
            _ => Err(ConfigError::MissingField {
                field: SUBACCOUNT_ID,
            }),
        }
    }
}

/// Append a snapshot of every definition to the account metadata.
///
/// App subscriptions go to `createdAppSubscriptions`, services to
/// `createdServiceInstances`, both in declaration order. Existing entries are
/// kept; missing lists are created.
///
/// # Errors
///
/// Returns an error if a definition cannot be serialized.
pub fn aggregate(
    registry: &DefinitionRegistry,
    mut metadata: AccountMetadata,
) -> Result<AccountMetadata, serde_json::Error> {
    let subscriptions = registry
        .applications()
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    let instances = registry
        .services()
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    metadata.list_mut(CREATED_SERVICE_INSTANCES).extend(instances);
    metadata.list_mut(CREATED_APP_SUBSCRIPTIONS).extend(subscriptions);
    Ok(metadata)
}
