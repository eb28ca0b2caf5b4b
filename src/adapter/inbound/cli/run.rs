//! Handler for the `run` command.

use std::path::Path;

use serde_json::json;
use tabled::{Table, Tabled};
use tokio::sync::watch;
use tracing::info;

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::output;
use crate::application::ProvisionReport;
use crate::domain::{AccountContext, ExecutionStatus, ResourceDefinition};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;
use crate::infrastructure::usecase::{load_metadata, load_usecase, write_metadata};

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Environment")]
    environment: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Execution")]
    execution: String,
}

impl ResourceRow {
    fn from_definition(def: &ResourceDefinition) -> Self {
        let execution = match def.execution_status {
            ExecutionStatus::Available => output::positive(def.execution_status),
            ExecutionStatus::Failed => output::negative(def.execution_status),
            other => other.to_string(),
        };
        Self {
            name: def.name.clone(),
            category: def.category.to_string(),
            environment: def.target_environment.to_string(),
            status: if def.entitle_only {
                output::muted("entitle only")
            } else {
                def.status.clone().unwrap_or_default()
            },
            execution,
        }
    }
}

/// Load configuration, use case and metadata from `args`.
///
/// Without `--config` the defaults apply.
pub(crate) fn load_config(args: &RunArgs) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.with_timing_overrides(args.interval, args.timeout)
}

/// Execute the run command.
///
/// Writes the aggregated metadata only once the run has converged.
pub async fn execute(args: &RunArgs, shutdown: watch::Receiver<bool>) -> Result<()> {
    let config = load_config(args)?;
    config.init_logging();

    let registry = load_usecase(&args.usecase)?;
    let metadata = load_metadata(&args.metadata)?;
    let account = AccountContext::from_metadata(&metadata)?;
    let output_path = args.output.as_deref().unwrap_or(&args.metadata);

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Subaccount", &account.subaccount_id);
    output::field("Apps", registry.applications().len());
    output::field("Services", registry.services().len());
    output::field("Interval", format!("{}s", config.timing().poll_interval.as_secs()));
    output::field("Timeout", format!("{}s", config.timing().timeout.as_secs()));

    let provisioner = bootstrap::build_provisioner(&config, account);
    let report = provisioner.provision(registry, metadata, shutdown).await?;

    write_metadata(output_path, &report.metadata)?;
    info!(path = %output_path.display(), "Account metadata written");

    print_report(&report, output_path);
    Ok(())
}

fn print_report(report: &ProvisionReport, output_path: &Path) {
    let duration_secs = report.duration().num_seconds();

    if output::is_json() {
        output::json_output(&json!({
            "type": "report",
            "payload": {
                "run_id": report.run_id,
                "passes": report.passes,
                "duration_secs": duration_secs,
                "metadata": output_path.display().to_string(),
                "applications": report.registry.applications(),
                "services": report.registry.services(),
            },
        }));
        return;
    }

    output::section("Resources");
    let rows: Vec<_> = report
        .registry
        .applications()
        .iter()
        .chain(report.registry.services())
        .map(ResourceRow::from_definition)
        .collect();
    if rows.is_empty() {
        output::note("(nothing to provision)");
    } else {
        output::lines(&Table::new(rows).to_string());
    }

    output::section("Summary");
    output::field("Run", report.run_id);
    output::field("Passes", report.passes);
    output::field("Duration", format!("{duration_secs}s"));
    output::field("Metadata", output::highlight(output_path.display()));
    output::success("All app subscriptions and service instances are available");
}
