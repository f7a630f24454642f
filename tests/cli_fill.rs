use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::Path;
use std::process::Command;

const CONFIG: &str = "tests/fixtures/quick.yaml";
const PAGE: &str = "tests/fixtures/signup.html";

fn sheetform() -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("sheetform");
    let mut cmd = Command::new(bin);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("stdout is a single json document")
}

fn control<'a>(report: &'a Value, key: &str) -> &'a Value {
    report["controls"]
        .as_array()
        .unwrap()
        .iter()
        .find(|control| control["key"] == key)
        .unwrap_or_else(|| panic!("control {key} missing"))
}

#[test]
fn fill_applies_every_eligible_row() {
    assert!(Path::new(PAGE).exists(), "fixture missing");

    let assert = sheetform()
        .args([
            "--config", CONFIG, "--output", "json", "fill", "--fields",
            "tests/fixtures/signup.csv", "--page", PAGE, "--seed", "7", "--dump",
        ])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());

    let result = &report["result"];
    assert_eq!(result["totalCount"], 7);
    assert_eq!(result["successCount"], 6);
    assert_eq!(result["skippedCount"], 1);
    assert_eq!(result["errorCount"], 0);

    assert_eq!(control(&report, "email")["value"], "ada@example.com");
    assert_eq!(control(&report, "nickname")["value"], "Ada");
    assert_eq!(control(&report, "city")["value"], "London");
    assert_eq!(control(&report, "plan")["value"], "pro");
    assert_eq!(control(&report, "terms")["checked"], true);
    assert_eq!(control(&report, "newsletter")["checked"], false);
}

#[test]
fn fill_reports_missing_fields_and_exits_non_zero() {
    let assert = sheetform()
        .args([
            "--config", CONFIG, "--output", "json", "fill", "--fields",
            "tests/fixtures/missing.json", "--page", PAGE,
        ])
        .assert()
        .failure();
    let report = stdout_json(assert.get_output());

    let result = &report["result"];
    assert_eq!(result["successCount"], 1);
    assert_eq!(result["errorCount"], 1);
    let failure = &result["errors"][0];
    assert_eq!(failure["fieldName"], "Phone");
    assert_eq!(failure["kind"], "ElementNotFound");
    assert!(failure["message"].as_str().unwrap().contains("2 attempt"));
}

#[test]
fn fill_rejects_a_header_only_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = dir.path().join("empty.csv");
    std::fs::write(&sheet, "Field,Selector,Type,Value\n").unwrap();

    let assert = sheetform()
        .args(["--config", CONFIG, "fill", "--fields"])
        .arg(&sheet)
        .args(["--page", PAGE])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("header row and one data row"), "{stderr}");
}

#[test]
fn check_classifies_rows_without_a_page() {
    let assert = sheetform()
        .args(["--output", "json", "check", "--fields", "tests/fixtures/signup.csv"])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());

    let fields = report["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 7);
    assert_eq!(fields[2]["kind"], "placeholder");
    assert_eq!(fields[4]["action"], "CHECK");
    assert_eq!(fields[6]["trigger"], "SKIP");
    assert!(fields[6]["skip"].is_string());
    assert!(fields[0].get("skip").is_none());
}

#[test]
fn config_show_applies_environment_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config = Path::new(CONFIG).canonicalize().unwrap();

    let assert = sheetform()
        .current_dir(dir.path())
        .env("SHEETFORM_RESOLVER__MAX_ATTEMPTS", "4")
        .env("SHEETFORM_STRICT_TOGGLE_VERIFICATION", "true")
        .arg("--config")
        .arg(&config)
        .args(["--output", "json", "config", "show"])
        .assert()
        .success();
    let shown = stdout_json(assert.get_output());

    assert_eq!(shown["resolver"]["max_attempts"], 4);
    assert_eq!(shown["resolver"]["retry_pause_ms"], 10);
    assert_eq!(shown["strict_toggle_verification"], true);
    assert_eq!(shown["highlight"]["enabled"], false);
}
