//! CLI contract tests: exit codes, JSON shape and config handling of the
//! `telemetry-query` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

/// Command running in an empty temp dir so no stray config is picked up.
fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("telemetry-query").expect("binary built");
    cmd.current_dir(dir.path())
        .env_remove("TELEMETRY_QUERY_CONFIG")
        .env("RUST_LOG", "warn");
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is JSON")
}

// =============================================================================
// JSON output
// =============================================================================

#[test]
fn json_report_contains_all_sections() {
    let dir = TempDir::new().unwrap();
    let json = json_output(cmd(&dir).args([
        "--count", "500", "--seed", "11", "--format", "json", "--page-size", "20",
    ]));

    assert_eq!(json["dataset"]["total"], 500);
    assert_eq!(json["aggregate"]["method"], "count");
    assert_eq!(json["aggregate"]["value"], 500.0);
    assert_eq!(json["aggregate"]["count"], 500);
    assert_eq!(json["summary"]["count"], 500);
    assert_eq!(json["page"]["number"], 1);
    assert_eq!(json["page"]["totalItems"], 500);
    assert_eq!(json["page"]["totalPages"], 25);
    assert_eq!(json["page"]["records"].as_array().unwrap().len(), 20);
    assert_eq!(json["criteria"]["startTime"], serde_json::Value::Null);
}

#[test]
fn event_type_filter_and_p95() {
    let dir = TempDir::new().unwrap();
    let json = json_output(cmd(&dir).args([
        "--count", "2000", "--seed", "5", "--format", "json",
        "--event-type", "error", "--method", "p95", "--inline",
    ]));

    let records = json["page"]["records"].as_array().unwrap();
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r["eventType"] == "error"));
    let p95 = json["aggregate"]["value"].as_f64().unwrap();
    assert!((400.0..=599.0).contains(&p95), "p95 {p95}");
    assert_eq!(json["criteria"]["eventTypes"], serde_json::json!(["error"]));
}

#[test]
fn same_seed_same_output_in_both_modes() {
    let dir = TempDir::new().unwrap();
    let args = ["--count", "800", "--seed", "9", "--format", "json", "--method", "average"];
    let worker = json_output(cmd(&dir).args(args));
    let inline = json_output(cmd(&dir).args(args).arg("--inline"));
    // timestamps trail the wall clock, so only value-derived fields are compared
    assert_eq!(worker["aggregate"]["count"], inline["aggregate"]["count"]);
    assert_eq!(worker["summary"], inline["summary"]);
}

#[test]
fn page_beyond_end_is_empty_not_error() {
    let dir = TempDir::new().unwrap();
    let json = json_output(cmd(&dir).args([
        "--count", "30", "--seed", "1", "--format", "json", "--page", "9", "--page-size", "10",
    ]));
    assert_eq!(json["page"]["records"].as_array().unwrap().len(), 0);
    assert_eq!(json["page"]["totalPages"], 3);
}

#[test]
fn zero_records_is_fine() {
    let dir = TempDir::new().unwrap();
    let json = json_output(cmd(&dir).args(["--count", "0", "--format", "json", "--method", "average"]));
    assert_eq!(json["aggregate"]["value"], 0.0);
    assert_eq!(json["page"]["totalPages"], 1);
    assert_eq!(json["dataset"]["timeRange"], serde_json::Value::Null);
}

// =============================================================================
// Text output
// =============================================================================

#[test]
fn text_output_has_summary_and_page() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--count", "120", "--seed", "2", "--page-size", "50", "--page", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dataset : 120 records"))
        .stdout(predicate::str::contains("count   : 120.00 over 120 records"))
        .stdout(predicate::str::contains("page    : 3 of 3 (showing 101-120 of 120)"));
}

#[test]
fn interactive_mode_reads_commands_from_stdin() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--count", "60", "--seed", "4", "--page-size", "25", "--interactive"])
        .write_stdin("\n3\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("page    : 2 of 3 (showing 26-50 of 60)"))
        .stdout(predicate::str::contains("page    : 3 of 3 (showing 51-60 of 60)"))
        .stdout(predicate::str::contains("Bye!"));
}

// =============================================================================
// Config file
// =============================================================================

#[test]
fn config_file_supplies_defaults_and_cli_wins() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("telemetry.toml"),
        "count = 300\nseed = 8\nformat = \"json\"\nmethod = \"average\"\npage_size = 7\n",
    )
    .unwrap();

    let json = json_output(cmd(&dir).args(["--method", "count"]));
    assert_eq!(json["dataset"]["total"], 300);
    assert_eq!(json["aggregate"]["method"], "count");
    assert_eq!(json["page"]["size"], 7);
}

#[test]
fn malformed_config_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.toml"), "count = \"many\"\n").unwrap();
    cmd(&dir)
        .args(["--config", "bad.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("bad config"));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn negative_count_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--count=-5"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("record count must be non-negative"));
}

#[test]
fn zero_page_size_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--count", "10", "--seed", "1", "--page-size", "0"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("page size must be greater than 0"));
}

#[test]
fn zero_page_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--count", "10", "--seed", "1", "--page", "0", "--format", "json"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("page number must be at least 1"));
}

#[test]
fn impossible_date_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--count", "10", "--from", "2024-02-31"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("bad date"));
    cmd(&dir)
        .args(["--count", "10", "--to", "999999999999-01-01"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("bad year"));
}

#[test]
fn unknown_event_type_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--event-type", "fatal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown event type"));
}
