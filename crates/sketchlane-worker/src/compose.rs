//! Result composition.

use std::path::Path;

use serde_json::Value;
use sketchlane_protocol::ops::{BuildResult, ProcessOutcome, UploadPhase};

use crate::artifacts::extract_artifacts;
use crate::diagnostics::diagnostics_from_output;

/// Parse non-empty stdout as JSON; anything else yields `None`.
pub fn parse_structured(stdout: &str) -> Option<Value> {
    if stdout.trim().is_empty() {
        return None;
    }
    serde_json::from_str(stdout).ok()
}

/// `compiler_out`, or `builder_result` when that is empty or missing.
pub fn build_info(result_json: &Value) -> Option<Value> {
    let object = result_json.as_object()?;
    object
        .get("compiler_out")
        .filter(|v| is_truthy(v))
        .or_else(|| object.get("builder_result").filter(|v| !v.is_null()))
        .cloned()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Compose the compile phase; artifacts are read whatever the exit status.
pub fn compose_build(outcome: ProcessOutcome, output_dir: &Path) -> BuildResult {
    let diagnostics = diagnostics_from_output(&outcome.stdout, &outcome.stderr);
    let result_json = parse_structured(&outcome.stdout);
    let build_info = result_json.as_ref().and_then(build_info);
    BuildResult {
        diagnostics,
        artifacts: extract_artifacts(output_dir),
        result_json,
        build_info,
        outcome,
    }
}

/// Compose the upload phase.
pub fn compose_upload(outcome: ProcessOutcome) -> UploadPhase {
    UploadPhase {
        diagnostics: diagnostics_from_output(&outcome.stdout, &outcome.stderr),
        result_json: parse_structured(&outcome.stdout),
        outcome,
    }
}
