use clap::Subcommand;

use super::check::CheckArgs;
use super::config::ConfigArgs;
use super::fill::FillArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Fill a page from a field sheet
    Fill(FillArgs),

    /// Parse a field sheet and show how each row would be handled
    Check(CheckArgs),

    /// Inspect SheetForm configuration
    Config(ConfigArgs),
}
