//! Integration tests for the flowtrace binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const BALANCED: &str = r#"{"trace":{"trace_id":1,"session_id":"s","hostname":"srv"},"events":[
{"type":"CallOperation","timestamp":1,"trace_id":1,"order_index":0,"operation_signature":"void app.A.a()","class_signature":"app.A","callee_operation_signature":"void app.B.b()","callee_class_signature":"app.B"},
{"type":"BeforeOperation","timestamp":2,"trace_id":1,"order_index":1,"operation_signature":"void app.B.b()","class_signature":"app.B"},
{"type":"CallOperation","timestamp":3,"trace_id":1,"order_index":2,"operation_signature":"void app.B.b()","class_signature":"app.B","callee_operation_signature":"void app.C.c()","callee_class_signature":"app.C"},
{"type":"BeforeOperation","timestamp":4,"trace_id":1,"order_index":3,"operation_signature":"void app.C.c()","class_signature":"app.C"},
{"type":"AfterOperation","timestamp":5,"trace_id":1,"order_index":4,"operation_signature":"void app.C.c()","class_signature":"app.C"},
{"type":"AfterOperation","timestamp":6,"trace_id":1,"order_index":5,"operation_signature":"void app.B.b()","class_signature":"app.B"}
]}"#;

const BROKEN: &str = r#"{"trace":{"trace_id":2,"session_id":"s","hostname":"srv"},"events":[
{"type":"AfterOperation","timestamp":1,"trace_id":2,"order_index":0,"operation_signature":"void app.A.a()","class_signature":"app.A"}
]}"#;

fn input(traces: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[{}]", traces.join(",")).unwrap();
    file
}

#[test]
fn test_text_output() {
    let file = input(&[BALANCED]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("trace 1: success (2 executions, 4 messages)"))
        .stdout(predicate::str::contains("  [0] srv::app.B  void b()  2..6"))
        .stdout(predicate::str::contains("    [1] srv::app.C  void c()  4..5"))
        .stdout(predicate::str::contains("1 traces: 1 succeeded"));
}

#[test]
fn test_json_output() {
    let file = input(&[BALANCED]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--format").arg("json").arg(file.path());

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["format"], "flowtrace-json-v1");
    assert_eq!(parsed["summary"]["succeeded"], 1);
    assert_eq!(parsed["traces"][0]["executions"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["traces"][0]["messages"][1]["kind"], "call");
}

#[test]
fn test_json_lines_input() {
    let mut file = NamedTempFile::new().unwrap();
    let one_line = BALANCED.replace('\n', "");
    writeln!(file, "{}", one_line).unwrap();
    writeln!(file, "{}", one_line.replace("\"trace_id\":1", "\"trace_id\":3")).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("-c").arg(file.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 traces: 2 succeeded"));
}

#[test]
fn test_invalid_trace_fails_run() {
    let file = input(&[BALANCED, BROKEN]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg(file.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("trace 2: failed"))
        .stderr(predicate::str::contains("1 trace(s) could not be reconstructed"));
}

#[test]
fn test_ignore_invalid_traces() {
    let file = input(&[BALANCED, BROKEN]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--ignore-invalid").arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 succeeded, 0 partial, 1 failed"));
}

#[test]
fn test_ignore_invalid_from_config_file() {
    let file = input(&[BROKEN]);
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "ignore_invalid_traces = true").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--config").arg(config.path()).arg(file.path());
    cmd.assert().success();
}

#[test]
fn test_select_traces() {
    let file = input(&[BALANCED, BROKEN]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--select-traces").arg("select=1").arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("trace 2: skipped"))
        .stdout(predicate::str::contains("1 succeeded, 0 partial, 0 failed, 1 skipped"));
}

#[test]
fn test_invalid_select_expression() {
    let file = input(&[BALANCED]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--select-traces").arg("trace=1").arg(file.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid trace selection"));
}

#[test]
fn test_output_file() {
    let file = input(&[BALANCED]);
    let out = NamedTempFile::new().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("-o").arg(out.path()).arg(file.path());

    cmd.assert().success().stdout(predicate::str::is_empty());
    let written = std::fs::read_to_string(out.path()).unwrap();
    assert!(written.contains("trace 1: success"));
}

#[test]
fn test_parallel_workers() {
    let traces: Vec<String> = (1..=8)
        .map(|id| BALANCED.replace("\"trace_id\":1", &format!("\"trace_id\":{}", id)))
        .collect();
    let refs: Vec<&str> = traces.iter().map(String::as_str).collect();
    let file = input(&refs);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--workers").arg("4").arg("-c").arg(file.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("8 traces: 8 succeeded"));
}

#[test]
fn test_missing_input_file() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("/nonexistent/traces.json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read trace input"));
}

#[test]
fn test_zero_workers_rejected() {
    let file = input(&[BALANCED]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--workers").arg("0").arg(file.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("workers must be >= 1"));
}

#[test]
fn test_messages_shown_by_default() {
    let file = input(&[BALANCED]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg(file.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("call $.$ -> "));
}

#[test]
fn test_no_messages_hides_message_lines() {
    let file = input(&[BALANCED]);
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flowtrace");
    cmd.arg("--no-messages").arg(file.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("trace 1: success (2 executions, 4 messages)"))
        .stdout(predicate::str::contains("call $.$ -> ").not())
        .stdout(predicate::str::contains("reply ").not());
}
