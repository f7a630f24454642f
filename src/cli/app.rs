use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, LoadedConfig, LogOptions};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&LogOptions {
        level: &cli.log_level,
        debug: cli.debug,
        json: cli.log_json,
        dir: cli.log_dir.as_deref(),
    })?;

    info!("Starting SheetForm v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig { config, path } = load_config(cli.config.as_deref())?;
    let cli_context = CliContext::new(config, path);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
