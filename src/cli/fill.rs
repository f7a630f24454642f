use std::path::PathBuf;
use std::sync::Arc;

use action_flow::{EngineConfig, Orchestrator};
use anyhow::{bail, Context, Result};
use clap::Args;
use dom_adapter::{ControlState, DomPort, MemoryPage};
use serde::Serialize;
use sheetform_core_types::RunResult;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::{print_json, OutputFormat};
use crate::sheet::{load_sheet, DroppedRow};

#[derive(Args, Clone, Debug)]
pub struct FillArgs {
    /// Field sheet: CSV export or JSON field list
    #[arg(short, long, value_name = "FILE")]
    pub fields: PathBuf,

    /// HTML snapshot to fill
    #[arg(short, long, value_name = "FILE", required_unless_present = "cdp")]
    pub page: Option<PathBuf>,

    /// DevTools websocket URL of a running browser
    #[arg(long, value_name = "URL", conflicts_with = "page")]
    pub cdp: Option<String>,

    /// Seed the delay and event randomness for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tempo file overriding the `timing` and `synthesis` sections
    #[arg(long, value_name = "FILE")]
    pub tempo: Option<PathBuf>,

    /// Print the final state of every form control (snapshot pages only)
    #[arg(long)]
    pub dump: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FillReport<'a> {
    result: &'a RunResult,
    dropped_rows: &'a [DroppedRow],
    #[serde(skip_serializing_if = "Option::is_none")]
    controls: Option<Vec<ControlState>>,
}

enum Target {
    Snapshot(MemoryPage),
    #[cfg(feature = "chromium")]
    Browser(Arc<dom_adapter::ChromiumPage>),
}

impl Target {
    fn port(&self) -> Arc<dyn DomPort> {
        match self {
            Target::Snapshot(page) => Arc::new(page.clone()),
            #[cfg(feature = "chromium")]
            Target::Browser(page) => Arc::clone(page) as Arc<dyn DomPort>,
        }
    }

    fn controls(&self) -> Option<Vec<ControlState>> {
        match self {
            Target::Snapshot(page) => Some(page.form_state()),
            #[cfg(feature = "chromium")]
            Target::Browser(_) => None,
        }
    }
}

pub async fn cmd_fill(args: FillArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let config = effective_config(&args, ctx.config())?;
    let sheet = load_sheet(&args.fields)
        .with_context(|| format!("Failed to load field sheet {}", args.fields.display()))?;

    let target = open_target(&args, &config).await?;
    let orchestrator = Orchestrator::new(target.port(), &config);
    let result = orchestrator.run(&sheet.fields).await?;

    let report = FillReport {
        result: &result,
        dropped_rows: &sheet.dropped,
        controls: if args.dump { target.controls() } else { None },
    };
    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Human => print_human(&report),
    }

    if !result.success() {
        bail!("{} of {} field(s) failed", result.error_count, result.total_count);
    }
    Ok(())
}

fn effective_config(args: &FillArgs, base: &EngineConfig) -> Result<EngineConfig> {
    let mut config = base.clone();
    if let Some(path) = &args.tempo {
        let bundle = stealth::config::load_bundle_from_path(path)
            .with_context(|| format!("Failed to load tempo file {}", path.display()))?;
        config.timing = bundle.timing;
        config.synthesis = bundle.synthesis;
    }
    if let Some(seed) = args.seed {
        config.timing.seed = Some(seed);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg_attr(not(feature = "chromium"), allow(unused_variables))]
async fn open_target(args: &FillArgs, config: &EngineConfig) -> Result<Target> {
    if let Some(path) = &args.page {
        let page = MemoryPage::from_file(path)
            .with_context(|| format!("Failed to read page snapshot {}", path.display()))?;
        info!(page = %path.display(), "filling page snapshot");
        return Ok(Target::Snapshot(page));
    }

    #[cfg(feature = "chromium")]
    {
        if let Some(url) = &args.cdp {
            let mut browser_config = dom_adapter::ChromiumConfig::new(url.clone());
            browser_config.search_frames = config.resolver.search_frames;
            let page = dom_adapter::ChromiumPage::connect(browser_config)
                .await
                .context("Failed to attach to browser")?;
            page.probe().await.context("Page is not ready")?;
            info!(url = %url, "attached to browser page");
            return Ok(Target::Browser(Arc::new(page)));
        }
    }

    #[cfg(not(feature = "chromium"))]
    {
        if args.cdp.is_some() {
            bail!("--cdp needs a build with the `chromium` feature");
        }
    }

    bail!("either --page or --cdp is required")
}

fn print_human(report: &FillReport<'_>) {
    let result = report.result;
    println!("Run {}", result.run_id);
    println!(
        "  filled: {}  failed: {}  skipped: {}  total: {}",
        result.success_count, result.error_count, result.skipped_count, result.total_count
    );
    println!(
        "  duration: {} ms",
        (result.finished_at - result.started_at).num_milliseconds()
    );

    if !result.errors.is_empty() {
        println!("\nFailures:");
        for failure in &result.errors {
            println!(
                "  - {} ({} '{}'): {:?}: {}",
                failure.field_name,
                failure.locator_kind,
                failure.locator,
                failure.kind,
                failure.message
            );
        }
    }

    if !report.dropped_rows.is_empty() {
        println!("\nDropped rows:");
        for row in report.dropped_rows {
            println!("  - row {}: {}", row.row, row.reason);
        }
    }

    if let Some(controls) = &report.controls {
        println!("\nControls:");
        for control in controls {
            match control.input_type.as_deref() {
                Some("checkbox" | "radio") => {
                    println!("  {} = {}", control.key, if control.checked { "[x]" } else { "[ ]" })
                }
                _ => println!("  {} = {:?}", control.key, control.value),
            }
        }
    }
}
