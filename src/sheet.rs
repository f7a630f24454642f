//! Field sheets: CSV exports and JSON field lists
//!
//! CSV layout: a header row, then `fieldName, locator, locatorKind, value[, trigger]`.

use std::fs;
use std::path::Path;

use action_flow::parse_field_list;
use serde::Serialize;
use serde_json::Value;
use sheetform_core_types::FieldDescriptor;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to read sheet: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sheet must have at least a header row and one data row")]
    MissingRows,

    #[error("no valid form fields found in sheet")]
    NoValidRows,

    #[error("{0}")]
    FieldList(String),
}

/// A data row that was dropped while reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    /// 1-based data row number (the header is row 0)
    pub row: usize,
    pub reason: String,
}

/// Parsed sheet, in row order
#[derive(Debug, Clone, Default)]
pub struct FieldSheet {
    pub fields: Vec<FieldDescriptor>,
    pub dropped: Vec<DroppedRow>,
}

/// Read a sheet from disk; `.json` files (or content starting with `[`) are JSON.
pub fn load_sheet(path: &Path) -> Result<FieldSheet, SheetError> {
    let raw = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
        || raw.trim_start().starts_with('[');

    let sheet = if is_json {
        parse_json(&raw)?
    } else {
        parse_csv(&raw)?
    };
    info!(
        path = %path.display(),
        fields = sheet.fields.len(),
        dropped = sheet.dropped.len(),
        "sheet loaded"
    );
    Ok(sheet)
}

pub fn parse_json(raw: &str) -> Result<FieldSheet, SheetError> {
    let value: Value = serde_json::from_str(raw)?;
    let fields = parse_field_list(&value).map_err(|err| SheetError::FieldList(err.to_string()))?;
    Ok(FieldSheet {
        fields,
        dropped: Vec::new(),
    })
}

pub fn parse_csv(raw: &str) -> Result<FieldSheet, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        records.push(record);
    }
    if records.len() < 2 {
        return Err(SheetError::MissingRows);
    }

    let mut sheet = FieldSheet::default();
    for (row, record) in records.iter().enumerate().skip(1) {
        if record.len() < 4 {
            debug!(row, columns = record.len(), "skipping row: insufficient columns");
            sheet.dropped.push(DroppedRow {
                row,
                reason: format!("insufficient columns ({})", record.len()),
            });
            continue;
        }

        let cell = |index: usize| record.get(index).map(clean_cell).unwrap_or_default();
        let locator = cell(1);
        if locator.is_empty() {
            debug!(row, "skipping row: no locator");
            sheet.dropped.push(DroppedRow {
                row,
                reason: "no locator".into(),
            });
            continue;
        }

        let field_name = Some(cell(0))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Field {row}"));
        let kind = Some(cell(2))
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| "auto".to_string());
        let mut field = FieldDescriptor::new(field_name, locator, kind, cell(3));
        if record.len() >= 5 {
            let trigger = cell(4);
            field = field.with_trigger(if trigger.is_empty() {
                "NORMAL".to_string()
            } else {
                trigger
            });
        }
        sheet.fields.push(field);
    }

    if sheet.fields.is_empty() {
        return Err(SheetError::NoValidRows);
    }
    Ok(sheet)
}

/// Trim and drop one layer of surrounding quotes left over from re-exported cells.
fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.replace("\"\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_rows() {
        let sheet = parse_csv(
            "Field,Selector,Type,Value,Trigger\n\
             Email,email,id,ada@example.com,FAST\n\
             ,#terms,,CHECK,\n\
             Short,only,three\n\
             \"Quoted, name\",\"input[name=\"\"q\"\"]\",css,\"hello, world\"\n\
             Blank,,id,x\n",
        )
        .unwrap();

        assert_eq!(sheet.fields.len(), 3);
        let email = &sheet.fields[0];
        assert_eq!(email.field_name, "Email");
        assert_eq!(email.trigger.as_deref(), Some("FAST"));

        let terms = &sheet.fields[1];
        assert_eq!(terms.field_name, "Field 2");
        assert_eq!(terms.locator_kind, "auto");
        assert_eq!(terms.trigger.as_deref(), Some("NORMAL"));

        let quoted = &sheet.fields[2];
        assert_eq!(quoted.field_name, "Quoted, name");
        assert_eq!(quoted.locator, "input[name=\"q\"]");
        assert_eq!(quoted.value, "hello, world");
        assert_eq!(quoted.trigger, None);

        assert_eq!(
            sheet.dropped,
            vec![
                DroppedRow {
                    row: 3,
                    reason: "insufficient columns (3)".into()
                },
                DroppedRow {
                    row: 5,
                    reason: "no locator".into()
                },
            ]
        );
    }

    #[test]
    fn test_header_only_sheet_is_rejected() {
        assert!(matches!(
            parse_csv("Field,Selector,Type,Value\n"),
            Err(SheetError::MissingRows)
        ));
        assert!(matches!(
            parse_csv("Field,Selector,Type,Value\nA,,id,x\n"),
            Err(SheetError::NoValidRows)
        ));
    }

    #[test]
    fn test_json_sheet() {
        let sheet = parse_json(
            r#"[{"fieldName":"Email","selector":"email","selectorType":"id","value":"a@b.c"}, 3]"#,
        )
        .unwrap();
        assert_eq!(sheet.fields.len(), 2);
        assert_eq!(sheet.fields[0].locator, "email");

        assert!(matches!(
            parse_json(r#"{"fieldName":"Email"}"#),
            Err(SheetError::FieldList(_))
        ));
    }
}
