//! Human-readable rendering of lane responses.

use std::fmt::Write;

use sketchlane_protocol::ops::{Artifacts, BuildResult, BuildResponse, Diagnostic, ProcessOutcome, UploadResponse};
use sketchlane_protocol::RpcError;

fn status_line(outcome: &ProcessOutcome) -> String {
    if outcome.timed_out {
        format!("timed out after {} ms", outcome.duration_ms)
    } else if outcome.succeeded() {
        format!("ok ({} ms)", outcome.duration_ms)
    } else {
        format!("failed with status {} ({} ms)", outcome.return_code, outcome.duration_ms)
    }
}

fn write_diagnostics(out: &mut String, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let errors = diagnostics.iter().filter(|d| d.level.as_str() == "error").count();
    let _ = writeln!(out, "  diagnostics: {} ({} errors)", diagnostics.len(), errors);
    for d in diagnostics {
        let _ = writeln!(out, "    {}:{}:{}: {}: {}", d.file, d.line, d.column, d.level, d.message);
    }
}

fn write_artifacts(out: &mut String, artifacts: &Artifacts) {
    for (label, artifact) in [("hex", &artifacts.hex), ("eep", &artifacts.eep)] {
        if let Some(a) = artifact {
            let short = a.sha256.get(..12).unwrap_or(&a.sha256);
            let _ = writeln!(out, "  {:<4} {:>8} bytes  sha256:{}  {}", label, a.size_bytes, short, a.path);
        }
    }
}

/// Failing output, shown only when nothing structured explains the failure.
fn write_raw_stderr(out: &mut String, outcome: &ProcessOutcome, diagnostics: &[Diagnostic]) {
    if outcome.succeeded() || !diagnostics.is_empty() {
        return;
    }
    let stderr = outcome.stderr.trim();
    if !stderr.is_empty() {
        let _ = writeln!(out, "  stderr:");
        for line in stderr.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
}

fn write_build_result(out: &mut String, result: &BuildResult) {
    let _ = writeln!(out, "  compile: {}", status_line(&result.outcome));
    write_diagnostics(out, &result.diagnostics);
    write_raw_stderr(out, &result.outcome, &result.diagnostics);
    write_artifacts(out, &result.artifacts);
}

/// Render a build response.
pub fn render_build(response: &BuildResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", response.sketch_name, response.target);
    write_build_result(&mut out, &response.result);
    out
}

/// Render an upload response.
pub fn render_upload(response: &UploadResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}] -> {}", response.sketch_name, response.target, response.port);
    write_build_result(&mut out, &response.build);
    match &response.upload {
        Some(upload) => {
            let _ = writeln!(out, "  upload: {}", status_line(&upload.outcome));
            write_diagnostics(&mut out, &upload.diagnostics);
            write_raw_stderr(&mut out, &upload.outcome, &upload.diagnostics);
        }
        None => {
            let _ = writeln!(out, "  upload: skipped");
        }
    }
    out
}

/// Render an error.
pub fn render_error(error: &RpcError) -> String {
    format!("error: {}", error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchlane_protocol::ops::{Artifact, Severity};

    fn diagnostic() -> Diagnostic {
        Diagnostic {
            file: "Blink.ino".to_string(),
            line: 3,
            column: 5,
            level: Severity::Error,
            message: "expected ';'".to_string(),
            raw: "Blink.ino:3:5: error: expected ';'".to_string(),
        }
    }

    #[test]
    fn test_render_failed_build() {
        let response = BuildResponse {
            target: "arduino:avr:uno".to_string(),
            sketch_name: "Blink".to_string(),
            result: BuildResult {
                outcome: ProcessOutcome {
                    return_code: 1,
                    stderr: "noise".to_string(),
                    duration_ms: 40,
                    ..Default::default()
                },
                diagnostics: vec![diagnostic()],
                ..Default::default()
            },
        };
        let text = render_build(&response);
        assert!(text.starts_with("Blink [arduino:avr:uno]\n"));
        assert!(text.contains("compile: failed with status 1 (40 ms)"));
        assert!(text.contains("diagnostics: 1 (1 errors)"));
        assert!(text.contains("Blink.ino:3:5: error: expected ';'"));
        assert!(!text.contains("noise"));
    }

    #[test]
    fn test_render_upload_with_artifact() {
        let mut build = BuildResult::default();
        build.artifacts.hex = Some(Artifact {
            path: "/tmp/out/Blink.ino.hex".to_string(),
            content: String::new(),
            size_bytes: 1234,
            sha256: "abcdef0123456789".to_string(),
        });
        let response = UploadResponse {
            target: "arduino:avr:uno".to_string(),
            sketch_name: "Blink".to_string(),
            port: "/dev/ttyACM0".to_string(),
            build,
            upload: None,
        };
        let text = render_upload(&response);
        assert!(text.contains("-> /dev/ttyACM0"));
        assert!(text.contains("sha256:abcdef012345"));
        assert!(text.contains("upload: skipped"));
    }

    #[test]
    fn test_render_timeout_stderr() {
        let outcome = ProcessOutcome {
            return_code: -1,
            timed_out: true,
            stderr: "Timeout after 1s while running: arduino-cli compile".to_string(),
            ..Default::default()
        };
        let response = BuildResponse {
            target: "t".to_string(),
            sketch_name: "s".to_string(),
            result: BuildResult {
                outcome,
                ..Default::default()
            },
        };
        let text = render_build(&response);
        assert!(text.contains("timed out"));
        assert!(text.contains("Timeout after 1s"));
    }
}
