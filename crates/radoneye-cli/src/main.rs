use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use radoneye_cli::cli::{Cli, Commands};
use radoneye_cli::commands::{cmd_config, cmd_list, run_device_command};
use radoneye_cli::config::{Config, resolve_adapter, resolve_client_config, resolve_device};
use radoneye_cli::util::{connect_device, require_device};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Logs go to stderr so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    let config = Config::load(&config_path);
    let mut out = io::stdout();

    match &cli.command {
        Commands::List { timeout, all } => {
            cmd_list(
                Duration::from_secs(*timeout),
                resolve_adapter(&cli, &config),
                *all,
                cli.output,
                &mut out,
            )
            .await
        }
        Commands::Config { action } => cmd_config(action, &config_path, &mut out),
        Commands::Device(command) => {
            let identifier =
                require_device(resolve_device(command.device().address.as_deref(), &config))?;
            let client = connect_device(
                &identifier,
                resolve_adapter(&cli, &config),
                resolve_client_config(&cli, &config),
            )
            .await?;

            let result =
                run_device_command(&client, &identifier, command, cli.output, &mut out).await;
            client.disconnect().await;
            result
        }
    }
}
