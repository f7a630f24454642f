use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sheetform_core_types::FieldDescriptor;

use crate::cli::output::{print_json, OutputFormat};
use crate::sheet::{load_sheet, DroppedRow};

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Field sheet: CSV export or JSON field list
    #[arg(short, long, value_name = "FILE")]
    pub fields: PathBuf,
}

/// How one field would be handled, without touching a page
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldPlan {
    pub position: usize,
    pub field_name: String,
    pub locator: String,
    pub kind: &'static str,
    pub action: &'static str,
    pub trigger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
}

impl FieldPlan {
    pub fn of(position: usize, field: &FieldDescriptor) -> Self {
        Self {
            position,
            field_name: field.field_name.clone(),
            locator: field.locator.clone(),
            kind: field.kind().name(),
            action: field.action().keyword(),
            trigger: field.trigger().to_string(),
            skip: field.eligibility().err().map(|reason| reason.to_string()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    fields: Vec<FieldPlan>,
    dropped_rows: &'a [DroppedRow],
}

pub async fn cmd_check(args: CheckArgs, output: OutputFormat) -> Result<()> {
    let sheet = load_sheet(&args.fields)
        .with_context(|| format!("Failed to load field sheet {}", args.fields.display()))?;
    let fields: Vec<FieldPlan> = sheet
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| FieldPlan::of(index + 1, field))
        .collect();

    match output {
        OutputFormat::Json => print_json(&CheckReport {
            fields,
            dropped_rows: &sheet.dropped,
        })?,
        OutputFormat::Human => {
            let eligible = fields.iter().filter(|plan| plan.skip.is_none()).count();
            println!(
                "{} field(s), {} eligible, {} skipped",
                fields.len(),
                eligible,
                fields.len() - eligible
            );
            for plan in &fields {
                let status = plan.skip.as_deref().unwrap_or("ok");
                println!(
                    "  {:>3}. {:<24} {:<12} {:<40} {:<10} {:<10} {}",
                    plan.position,
                    plan.field_name,
                    plan.kind,
                    plan.locator,
                    plan.action,
                    plan.trigger,
                    status
                );
            }
            for row in &sheet.dropped {
                println!("  row {} dropped: {}", row.row, row.reason);
            }
        }
    }
    Ok(())
}
