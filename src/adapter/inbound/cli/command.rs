//! Command-line interface definitions.
//!
//! Defines the CLI structure of the provisioner using `clap`: running a use
//! case, previewing its dependency forest, and validating configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Dependency-aware provisioning of app subscriptions and service instances
#[derive(Parser, Debug)]
#[command(name = "btp-provisioner")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision every app subscription and service instance of a use case
    Run(RunArgs),

    /// Show the dependency forest of a use case without calling any tool
    Plan(PlanArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Subcommands for `btp-provisioner config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration with defaults applied.
    Show(ConfigPathArg),
    /// Validate a configuration file for correctness.
    Validate(ConfigPathArg),
}

/// Arguments for `btp-provisioner run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (defaults apply without one)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use case file listing the apps and services to provision
    #[arg(short, long)]
    pub usecase: PathBuf,

    /// Account metadata file; must contain `subaccountid`
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Where to write the aggregated metadata (defaults to --metadata)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overall timeout in seconds (overrides the config file)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Base poll interval in seconds (overrides the config file)
    #[arg(long)]
    pub interval: Option<u64>,
}

/// Arguments for `btp-provisioner plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Use case file
    #[arg(short, long)]
    pub usecase: PathBuf,
}

/// A configuration file path.
#[derive(Args, Debug)]
pub struct ConfigPathArg {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}
