//! Integration tests for the `fncall` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise every subcommand
//! through the actual binary: stdin and file input, model conventions, config
//! files, streaming output, and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn fncall() -> Command {
    Command::cargo_bin("fncall").unwrap()
}

/// Run with `args` and `stdin`, assert success, and parse stdout as JSON.
fn run_json(args: &[&str], stdin: &str) -> Value {
    let output = fncall()
        .args(args)
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("stdout must be JSON")
}

/// Run `stream` and parse each stdout line as one JSON event.
fn run_stream(args: &[&str], stdin: &str) -> Vec<Value> {
    let output = fncall()
        .arg("stream")
        .args(args)
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line must be JSON"))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// parse
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn parse_call_expression_from_stdin() {
    let out = run_json(&["parse"], "foo(a=1, b=\"x\")\n");
    assert_eq!(
        out,
        json!([{"name": "foo", "arguments": {"a": 1.0, "b": "x"}}])
    );
}

#[test]
fn parse_json_syntax() {
    let out = run_json(
        &["parse", "--syntax", "json"],
        r#"[{"name":"f","arguments":{"x":true}}]"#,
    );
    assert_eq!(out, json!([{"name": "f", "arguments": {"x": true}}]));
}

#[test]
fn parse_empty_json_list() {
    assert_eq!(run_json(&["parse", "--syntax", "json"], "[]"), json!([]));
}

#[test]
fn parse_duplicate_key_fails() {
    fncall()
        .arg("parse")
        .write_stdin("foo(a=1, a=2)")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate key: a"));
}

#[test]
fn parse_syntax_error_reports_offset() {
    fncall()
        .arg("parse")
        .write_stdin("f(a=)")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syntax error at byte 4"));
}

#[test]
fn parse_missing_file_fails() {
    fncall()
        .args(["parse", "-i", "/nonexistent/input.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// split
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn split_literal_fences() {
    let out = run_json(
        &["split", "--start", "```", "--end", "```"],
        "before```mid```after",
    );
    assert_eq!(
        out,
        json!({"text_before": "before", "payload": "mid", "found_end": true})
    );
}

#[test]
fn split_missing_end_fence() {
    let out = run_json(&["split", "--start", "```", "--end", "```"], "before```mid");
    assert_eq!(out["found_end"], json!(false));
    assert_eq!(out["payload"], json!("mid"));
}

#[test]
fn split_pattern_fences() {
    let out = run_json(
        &["split", "--start", r"^\[", "--end", r"\]", "--pattern"],
        "see [1]\n[f()]",
    );
    assert_eq!(out["text_before"], json!("see [1]\n"));
    assert_eq!(out["payload"], json!("f()"));
}

#[test]
fn split_invalid_pattern_fails() {
    fncall()
        .args(["split", "--start", "(", "--end", ")", "--pattern"])
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid pattern"));
}

// ─────────────────────────────────────────────────────────────────────────────
// extract
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn extract_gemma_from_file() {
    let out = run_json(
        &["extract", "--model", "gemma", "-i", &fixture("gemma_response.txt")],
        "",
    );
    assert_eq!(
        out,
        json!({
            "role": "model",
            "parts": [
                {"text": "I will look that up.\n"},
                {"invocation": {"name": "get_weather", "arguments": {"city": "Paris", "days": 3.0}}}
            ]
        })
    );
}

#[test]
fn extract_hammer_from_file() {
    let out = run_json(
        &["extract", "--model", "hammer", "-i", &fixture("hammer_response.txt")],
        "",
    );
    assert_eq!(out["role"], json!("assistant"));
    assert_eq!(
        out["parts"],
        json!([{"invocation": {"name": "search", "arguments": {"query": "rust", "limit": 5.0}}}])
    );
}

#[test]
fn extract_llama_from_stdin() {
    let out = run_json(
        &["extract", "--model", "llama"],
        "[get_time(), find(q='x')]<|eot_id|>",
    );
    let names: Vec<&str> = out["parts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["invocation"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["get_time", "find"]);
}

#[test]
fn extract_with_config_format() {
    let out = run_json(
        &["--config", &fixture("custom.toml"), "extract"],
        r#"Sure. <tool_call>{"name": "f", "arguments": {}}</tool_call>"#,
    );
    assert_eq!(
        out,
        json!({
            "role": "assistant",
            "parts": [{"text": "Sure. "}, {"invocation": {"name": "f", "arguments": {}}}]
        })
    );
}

#[test]
fn extract_without_model_or_config_fails() {
    fncall()
        .arg("extract")
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--model"));
}

#[test]
fn invalid_config_file_fails() {
    fncall()
        .args(["--config", &fixture("gemma_response.txt"), "extract"])
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// stream
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn stream_gemma_in_small_chunks() {
    let response = std::fs::read_to_string(fixture("gemma_response.txt")).unwrap();
    let events = run_stream(&["--model", "gemma", "--chunk-size", "3"], &response);

    let text: String = events
        .iter()
        .filter_map(|e| e["text"].as_str())
        .collect();
    assert_eq!(text, "I will look that up.\n\nOne moment.");

    let calls: Vec<&Value> = events.iter().filter_map(|e| e.get("invocation")).collect();
    assert_eq!(
        calls,
        vec![&json!({"name": "get_weather", "arguments": {"city": "Paris", "days": 3.0}})]
    );
}

#[test]
fn stream_chunk_size_does_not_change_events() {
    let response = std::fs::read_to_string(fixture("gemma_response.txt")).unwrap();
    let invocations = |size: &str| -> Vec<Value> {
        run_stream(&["--model", "gemma", "--chunk-size", size], &response)
            .into_iter()
            .filter(|e| e.get("invocation").is_some())
            .collect()
    };
    assert_eq!(invocations("1"), invocations("1000"));
}

#[test]
fn stream_poisons_on_bad_payload() {
    fncall()
        .args(["stream", "--model", "gemma"])
        .write_stdin("ok ```tool_code\nf(a=1, a=2)\n``` more")
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#"{"text":"ok "}"#))
        .stderr(predicate::str::contains("Duplicate key"));
}

#[test]
fn stream_resume_from_config() {
    let events = run_stream(
        &["--config", &fixture("custom.toml"), "--chunk-size", "4"],
        r#"<tool_call>{bad}</tool_call>then <tool_call>{"name": "g", "arguments": {}}</tool_call>"#,
    );
    let calls: Vec<&str> = events
        .iter()
        .filter_map(|e| e["invocation"]["name"].as_str())
        .collect();
    assert_eq!(calls, vec!["g"]);
}

#[test]
fn stream_zero_chunk_size_fails() {
    fncall()
        .args(["stream", "--model", "gemma", "--chunk-size", "0"])
        .write_stdin("x")
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// convert
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn convert_call_to_json() {
    fncall()
        .args(["convert", "--from", "call", "--to", "json"])
        .write_stdin("f(a=1, b=[True, None])")
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "[{\"name\": \"f\", \"arguments\": {\"a\": 1, \"b\": [true, null]}}]\n",
        ));
}

#[test]
fn convert_json_to_call() {
    fncall()
        .args(["convert", "--from", "json", "--to", "call"])
        .write_stdin(r#"{"name": "g", "arguments": {"s": "hi", "x": 2.5}}"#)
        .assert()
        .success()
        .stdout(predicate::str::diff("[g(s=\"hi\", x=2.5)]\n"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Help
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    fncall()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("parse"))
        .stdout(predicate::str::contains("stream"))
        .stdout(predicate::str::contains("convert"));
}
