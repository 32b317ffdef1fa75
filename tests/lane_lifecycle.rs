//! Workspace lifecycle, deadlines, and concurrent builds.

#![cfg(unix)]

mod fixtures;

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fixtures::{leftovers, sketch_dir, FakeToolchain, COMPILE_FAILS, HANGS, TOOLCHAIN_OK};
use sketchlane::sources::load_sources;
use sketchlane::{Pipeline, RpcHandler};
use sketchlane_protocol::ops::{BuildRequest, NamedFile, UploadRequest, TIMEOUT_RETURN_CODE};
use sketchlane_protocol::{ErrorCode, RpcRequest};
use tempfile::TempDir;

fn inline(name: &str) -> BuildRequest {
    BuildRequest {
        sketch: Some("void setup(){}\nvoid loop(){}\n".to_string()),
        sketch_name: Some(name.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_no_workspace_leaks_across_outcomes() {
    let scratch = TempDir::new().unwrap();
    let ok = FakeToolchain::new(TOOLCHAIN_OK);
    let failing = FakeToolchain::new(COMPILE_FAILS);
    let ok_lane = Pipeline::new(&ok.config(scratch.path()));
    let failing_lane = Pipeline::new(&failing.config(scratch.path()));

    for i in 0..5 {
        ok_lane.build(&inline(&format!("Ok{}", i))).unwrap();
        failing_lane.build(&inline(&format!("Bad{}", i))).unwrap();
        let rejected = BuildRequest {
            files: vec![NamedFile::new("a/../../b.ino", "x")],
            ..Default::default()
        };
        assert!(ok_lane.build(&rejected).is_err());
    }

    assert!(leftovers(scratch.path()).is_empty(), "{:?}", leftovers(scratch.path()));
}

#[test]
fn test_timeout_kills_process_group() {
    let scratch = TempDir::new().unwrap();
    let tool = FakeToolchain::new(HANGS);
    let mut config = tool.config(scratch.path());
    config.compile_timeout_seconds = 1;

    let started = Instant::now();
    let response = Pipeline::new(&config).build(&inline("Slow")).unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));

    let outcome = &response.result.outcome;
    assert!(outcome.timed_out);
    assert_eq!(outcome.return_code, TIMEOUT_RETURN_CODE);
    assert!(outcome.stderr.contains("Timeout after 1s while running:"));
    assert!(response.result.artifacts.is_empty());
    assert!(leftovers(scratch.path()).is_empty());

    let pid = fs::read_to_string(tool.dir().join("grandchild.pid")).unwrap();
    let pid: i32 = pid.trim().parse().unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while fs::metadata(format!("/proc/{}", pid)).is_ok() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    if cfg!(target_os = "linux") {
        let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).unwrap_or_default();
        assert!(stat.is_empty() || stat.contains(") Z "), "grandchild survived: {}", stat);
    }
}

#[test]
fn test_timeout_maps_to_gateway_timeout() {
    let scratch = TempDir::new().unwrap();
    let tool = FakeToolchain::new(HANGS);
    let mut config = tool.config(scratch.path());
    config.compile_timeout_seconds = 1;

    let payload = serde_json::to_value(UploadRequest {
        build: inline("Slow"),
        port: Some("/dev/ttyUSB0".to_string()),
    })
    .unwrap();
    let response = RpcHandler::new(config).handle(&RpcRequest::new("upload", "t-1", payload));

    assert_eq!(response.status, 504);
    assert_eq!(response.error.unwrap().code, ErrorCode::ToolchainTimeout);
    let payload = response.payload.unwrap();
    assert_eq!(payload["build"]["timed_out"], true);
    assert_eq!(payload["build"]["return_code"], TIMEOUT_RETURN_CODE);
    assert!(payload["upload"].is_null());
    assert_eq!(tool.calls().len(), 1);
}

#[test]
fn test_concurrent_builds_are_isolated() {
    let scratch = TempDir::new().unwrap();
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let lane = Arc::new(Pipeline::new(&tool.config(scratch.path())));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let lane = Arc::clone(&lane);
            thread::spawn(move || lane.build(&inline(&format!("Sketch{}", i))).unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let response = handle.join().expect("build thread panicked");
        assert_eq!(response.sketch_name, format!("Sketch{}", i));
        let hex = response.result.artifacts.hex.expect("hex artifact");
        assert!(hex.path.ends_with(&format!("Sketch{}.ino.hex", i)), "{}", hex.path);
    }

    assert_eq!(tool.calls().len(), 8);
    assert!(leftovers(scratch.path()).is_empty());
}

#[test]
fn test_sketch_directory_sources() {
    let scratch = TempDir::new().unwrap();
    let sketches = TempDir::new().unwrap();
    let tool = FakeToolchain::new(TOOLCHAIN_OK);
    let dir = sketch_dir(sketches.path(), "Blink");

    let request = BuildRequest {
        files: load_sources(&dir).unwrap(),
        sketch_name: Some("Blink".to_string()),
        board: Some("mega".to_string()),
        ..Default::default()
    };
    let response = Pipeline::new(&tool.config(scratch.path())).build(&request).unwrap();

    assert!(response.result.succeeded());
    assert_eq!(response.target, "arduino:avr:mega");
    assert_eq!(tool.staged(), vec!["./Blink.ino", "./src/led.h"]);
}
