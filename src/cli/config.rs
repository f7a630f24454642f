use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Validate configuration
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let source = ctx
        .config_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());

    match args.action {
        ConfigAction::Show => match output {
            OutputFormat::Json => print_json(ctx.config())?,
            OutputFormat::Human => {
                println!("Current configuration ({}):", source);
                println!("{}", serde_yaml::to_string(ctx.config())?);
            }
        },
        ConfigAction::Validate => {
            ctx.config()
                .validate()
                .with_context(|| format!("Configuration from {} is invalid", source))?;
            println!("Configuration is valid ({})", source);
        }
    }
    Ok(())
}
