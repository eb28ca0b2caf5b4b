//! Run-wide timing of the provisioning loops.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::RunTiming;
use crate::error::ConfigError;

/// Poll cadence and overall timeout of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProvisioningConfig {
    /// Base pause between two passes of either loop, in seconds.
    #[serde(default = "default_repeat_status_request_secs")]
    pub repeat_status_request_secs: u64,
    /// Time after which a run that has not converged gives up, in seconds.
    #[serde(default = "default_repeat_status_timeout_secs")]
    pub repeat_status_timeout_secs: u64,
}

const fn default_repeat_status_request_secs() -> u64 {
    4
}

const fn default_repeat_status_timeout_secs() -> u64 {
    4200
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            repeat_status_request_secs: default_repeat_status_request_secs(),
            repeat_status_timeout_secs: default_repeat_status_timeout_secs(),
        }
    }
}

impl ProvisioningConfig {
    #[must_use]
    pub fn timing(&self) -> RunTiming {
        RunTiming::new(
            Duration::from_secs(self.repeat_status_request_secs),
            Duration::from_secs(self.repeat_status_timeout_secs),
        )
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.repeat_status_request_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "repeat_status_request_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.repeat_status_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "repeat_status_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.repeat_status_request_secs > self.repeat_status_timeout_secs {
            return Err(ConfigError::InvalidValue {
                field: "repeat_status_request_secs",
                reason: "must be <= repeat_status_timeout_secs".to_string(),
            });
        }
        Ok(())
    }
}
