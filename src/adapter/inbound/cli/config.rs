//! Handler for the `config` command group.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    if output::is_json() {
        output::json_output(&json!({
            "type": "config",
            "payload": serde_json::to_value(&config)?,
        }));
        return Ok(());
    }

    output::section("Effective Configuration");
    output::field("Path", path.display());

    output::section("Logging");
    output::field("Level", &config.logging.level);
    output::field("Format", &config.logging.format);

    output::section("Provisioning");
    output::field(
        "Interval",
        format!("{}s", config.provisioning.repeat_status_request_secs),
    );
    output::field(
        "Timeout",
        format!("{}s", config.provisioning.repeat_status_timeout_secs),
    );

    output::section("Tools");
    output::field("btp", &config.tools.btp);
    output::field("cf", &config.tools.cf);
    output::field("kubectl", &config.tools.kubectl);
    output::field("Timeout", format!("{}s", config.tools.command_timeout_secs));
    Ok(())
}

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    Config::load(path)?;

    output::success("Configuration is valid");
    output::field("Path", path.display());
    output::hint("preview a use case with: btp-provisioner plan --usecase <file>");
    Ok(())
}
