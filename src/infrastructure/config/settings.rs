//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings of the
//! provisioner. Configuration is loaded from a TOML file; every section is
//! optional and falls back to its defaults.
//!
//! # Example
//!
//! ```no_run
//! use btp_provisioner::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::provisioning::ProvisioningConfig;
use super::tools::ToolsConfig;
use crate::domain::RunTiming;
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Poll interval and timeout of the provisioning loops.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    /// Command line tools used to reach the account.
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., a zero timeout)
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first invalid or missing value.
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.provisioning.validate()?;
        self.tools.validate()?;
        Ok(())
    }

    /// Override the poll interval and timeout, then re-validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting timing is invalid.
    pub fn with_timing_overrides(
        mut self,
        interval_secs: Option<u64>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        if let Some(interval) = interval_secs {
            self.provisioning.repeat_status_request_secs = interval;
        }
        if let Some(timeout) = timeout_secs {
            self.provisioning.repeat_status_timeout_secs = timeout;
        }
        self.provisioning.validate()?;
        Ok(self)
    }

    /// Timing handed to both control loops.
    #[must_use]
    pub fn timing(&self) -> RunTiming {
        self.provisioning.timing()
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.tools.command_timeout()
    }

    /// Initialize the tracing subscriber from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
