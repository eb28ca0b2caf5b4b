//! External command line tools the adapters shell out to.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Program names (or paths) and the per-command timeout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_btp")]
    pub btp: String,
    #[serde(default = "default_cf")]
    pub cf: String,
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
    /// Upper bound for a single tool invocation, in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_btp() -> String {
    "btp".to_string()
}

fn default_cf() -> String {
    "cf".to_string()
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

const fn default_command_timeout_secs() -> u64 {
    120
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            btp: default_btp(),
            cf: default_cf(),
            kubectl: default_kubectl(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tools.btp", &self.btp),
            ("tools.cf", &self.cf),
            ("tools.kubectl", &self.kubectl),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField { field });
            }
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "command_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
