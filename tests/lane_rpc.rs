//! End-to-end RPC tests against a fake toolchain.
//!
//! Each test writes one JSON request line into the handler and checks the
//! single JSON response line it produces.

#![cfg(unix)]

mod fixtures;

use std::io::Cursor;

use fixtures::{FakeToolchain, COMPILE_FAILS, TOOLCHAIN_OK, UPLOAD_FAILS};
use serde_json::{json, Value};
use sketchlane::{ErrorCode, LaneConfig, RpcHandler, RpcResponse};
use tempfile::TempDir;

fn roundtrip(config: LaneConfig, request: Value) -> RpcResponse {
    let handler = RpcHandler::new(config);
    let mut input = Cursor::new(format!("{}\n", request));
    let mut output = Vec::new();
    handler.run_with_io(&mut input, &mut output).unwrap();

    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.matches('\n').count(), 1, "exactly one response line");
    serde_json::from_str(&text).unwrap()
}

fn request(op: &str, payload: Value) -> Value {
    json!({"protocol_version": 1, "op": op, "request_id": "req-1", "payload": payload})
}

fn blink() -> Value {
    json!({"sketch": "void setup(){}\nvoid loop(){}\n", "sketchName": "Blink", "board": "nano"})
}

#[test]
fn test_build_success_envelope() {
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let scratch = TempDir::new().unwrap();
    let response = roundtrip(tool.config(scratch.path()), request("build", blink()));

    assert!(response.ok);
    assert_eq!(response.status, 200);
    assert_eq!(response.request_id, "req-1");
    assert!(response.error.is_none());

    let payload = response.payload.unwrap();
    assert_eq!(payload["target"], "arduino:avr:nano");
    assert_eq!(payload["sketchName"], "Blink");
    assert_eq!(payload["return_code"], 0);
    assert_eq!(payload["timed_out"], false);
    assert_eq!(payload["build_info"], "Sketch uses 444 bytes");
    assert_eq!(payload["artifacts"]["hex"]["content"], ":00000001FF\n");
    assert_eq!(payload["artifacts"]["hex"]["size_bytes"], 12);
    assert_eq!(payload["artifacts"]["hex"]["sha256"].as_str().unwrap().len(), 64);
    assert!(payload["artifacts"]["eep"].is_object());

    assert_eq!(tool.staged(), vec!["./Blink.ino"]);
}

#[test]
fn test_build_failure_carries_result() {
    let tool = FakeToolchain::new(COMPILE_FAILS);
    let scratch = TempDir::new().unwrap();
    let response = roundtrip(tool.config(scratch.path()), request("build", blink()));

    assert!(!response.ok);
    assert_eq!(response.status, 400);
    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::ToolchainFailed);

    let payload = response.payload.unwrap();
    assert_eq!(payload["return_code"], 1);
    let diagnostics = payload["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0]["file"], "Blink.ino");
    assert_eq!(diagnostics[0]["line"], 3);
    assert_eq!(diagnostics[0]["column"], 5);
    assert_eq!(diagnostics[0]["level"], "error");
    assert_eq!(diagnostics[1]["level"], "warning");
    assert!(payload["artifacts"]["hex"].is_null());
}

#[test]
fn test_rejected_build_never_runs_toolchain() {
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let scratch = TempDir::new().unwrap();
    let payload = json!({"files": [{"name": "/etc/passwd", "content": "x"}]});
    let response = roundtrip(tool.config(scratch.path()), request("build", payload));

    assert_eq!(response.status, 400);
    assert_eq!(response.error.unwrap().code, ErrorCode::InvalidRequest);
    assert!(tool.calls().is_empty());
    assert!(fixtures::leftovers(scratch.path()).is_empty());
}

#[test]
fn test_defines_and_flags_reach_compiler() {
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let scratch = TempDir::new().unwrap();
    let mut payload = blink();
    payload["defines"] = json!({"DEBUG": true, "BAUD": 9600, "OFF": false});
    payload["extra_flags"] = json!(["-Os"]);
    payload["warnings"] = json!("all");
    let response = roundtrip(tool.config(scratch.path()), request("build", payload));
    assert!(response.ok);

    let calls = tool.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("--warnings all"));
    assert!(calls[0].contains("compiler.cpp.extra_flags=-DDEBUG -DBAUD=9600 -DOFF=0 -Os"));
    assert!(calls[0].contains("compiler.c.extra_flags=-DDEBUG -DBAUD=9600 -DOFF=0 -Os"));
}

#[test]
fn test_define_order_follows_request() {
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let scratch = TempDir::new().unwrap();
    let line = r#"{"protocol_version":1,"op":"build","request_id":"req-2","payload":{"sketch":"void setup(){}","defines":{"FOO":1,"BAR":"9600"},"extra_flags":["-Os"]}}"#;
    let handler = RpcHandler::new(tool.config(scratch.path()));
    let mut output = Vec::new();
    handler.run_with_io(&mut Cursor::new(format!("{}\n", line)), &mut output).unwrap();
    let response: RpcResponse = serde_json::from_slice(&output).unwrap();
    assert!(response.ok);

    let calls = tool.calls();
    assert!(calls[0].contains("compiler.c.extra_flags=-DFOO -DBAR=9600 -Os"));
    assert!(calls[0].contains("compiler.cpp.extra_flags=-DFOO -DBAR=9600 -Os"));
}

#[test]
fn test_upload_runs_after_compile() {
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let scratch = TempDir::new().unwrap();
    let mut payload = blink();
    payload["port"] = json!("/dev/ttyACM0");
    let response = roundtrip(tool.config(scratch.path()), request("upload", payload));

    assert!(response.ok);
    let payload = response.payload.unwrap();
    assert_eq!(payload["port"], "/dev/ttyACM0");
    assert_eq!(payload["upload"]["result_json"], json!({"success": true}));

    let calls = tool.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("compile "));
    assert!(calls[1].starts_with("upload --fqbn arduino:avr:nano --port /dev/ttyACM0"));
}

#[test]
fn test_upload_skipped_when_compile_fails() {
    let tool = FakeToolchain::new(COMPILE_FAILS);
    let scratch = TempDir::new().unwrap();
    let mut payload = blink();
    payload["port"] = json!("/dev/ttyACM0");
    let response = roundtrip(tool.config(scratch.path()), request("upload", payload));

    assert_eq!(response.status, 400);
    assert_eq!(response.error.unwrap().code, ErrorCode::ToolchainFailed);
    let payload = response.payload.unwrap();
    assert!(payload["upload"].is_null());
    assert_eq!(payload["build"]["return_code"], 1);

    let calls = tool.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("compile "));
}

#[test]
fn test_upload_failure_reported() {
    let tool = FakeToolchain::new(UPLOAD_FAILS);
    let scratch = TempDir::new().unwrap();
    let mut payload = blink();
    payload["port"] = json!("/dev/ttyACM0");
    let response = roundtrip(tool.config(scratch.path()), request("upload", payload));

    assert!(!response.ok);
    assert_eq!(response.error.unwrap().code, ErrorCode::ToolchainFailed);
    let payload = response.payload.unwrap();
    assert_eq!(payload["build"]["return_code"], 0);
    assert_eq!(payload["upload"]["return_code"], 2);
    assert!(payload["upload"]["stderr"].as_str().unwrap().contains("no device found"));
}

#[test]
fn test_catalog_passthrough() {
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let scratch = TempDir::new().unwrap();
    let response = roundtrip(tool.config(scratch.path()), request("ports", json!({})));

    assert!(response.ok);
    assert_eq!(response.payload.unwrap(), json!({"detected_ports": []}));
    assert_eq!(tool.calls(), vec!["board list --format json"]);
}

#[test]
fn test_probe_reports_toolchain_version() {
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let scratch = TempDir::new().unwrap();
    let mut config = tool.config(scratch.path());
    config.allowed_targets = vec!["arduino:avr:uno".to_string()];
    let probe = json!({"protocol_version": 0, "op": "probe", "request_id": "p", "payload": {}});
    let response = roundtrip(config, probe);

    assert!(response.ok);
    assert_eq!(response.protocol_version, 0);
    let payload = response.payload.unwrap();
    assert_eq!(payload["versions"]["arduino_cli"], "1.1.1");
    assert_eq!(payload["settings"]["allowed_targets"], json!(["arduino:avr:uno"]));
    assert_eq!(payload["protocol_min"], 1);
    assert_eq!(payload["protocol_max"], 1);
}
