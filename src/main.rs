use btp_provisioner::adapter::inbound::cli::command::{Cli, ColorChoice, Commands, ConfigCommand};
use btp_provisioner::adapter::inbound::cli::output::{self, OutputConfig};
use btp_provisioner::adapter::inbound::cli::{config, plan, run};
use btp_provisioner::error::Result;
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    if let Err(err) = dispatch(cli.command).await {
        output::error(&err.to_string());
        std::process::exit(err.exit_code());
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => {
            let (stop, shutdown) = watch::channel(false);
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                    let _ = stop.send(true);
                }
            });
            run::execute(&args, shutdown).await
        }
        Commands::Plan(args) => plan::execute(&args),
        Commands::Config(ConfigCommand::Show(args)) => config::execute_show(&args.config),
        Commands::Config(ConfigCommand::Validate(args)) => config::execute_validate(&args.config),
    }
}
