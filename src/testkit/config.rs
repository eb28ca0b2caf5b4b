//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::domain::RunTiming;
use crate::infrastructure::config::Config;
use crate::infrastructure::config::provisioning::ProvisioningConfig;

/// Short run timing: one second between passes, one minute overall.
pub fn fast_timing() -> RunTiming {
    fast().timing()
}

/// Default configuration with short polling.
pub fn fast() -> Config {
    Config {
        provisioning: ProvisioningConfig {
            repeat_status_request_secs: 1,
            repeat_status_timeout_secs: 60,
        },
        ..Config::default()
    }
}
