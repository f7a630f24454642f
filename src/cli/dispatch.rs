use super::check::cmd_check;
use super::config::cmd_config;
use super::env::CliArgs;
use super::fill::cmd_fill;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Fill(args) => cmd_fill(args, ctx, cli.output).await,
        Commands::Check(args) => cmd_check(args, cli.output).await,
        Commands::Config(args) => cmd_config(args, ctx, cli.output).await,
    }
}
