//! GCC-style diagnostic extraction.

use std::sync::OnceLock;

use regex_lite::Regex;
use sketchlane_protocol::ops::{Diagnostic, Severity};

const DIAGNOSTIC_PATTERN: &str =
    r"^(?P<file>[^:\n]+):(?P<line>\d+):(?P<col>\d+):\s*(?P<level>error|warning|note):\s*(?P<msg>.+)$";

fn diagnostic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIAGNOSTIC_PATTERN).expect("static pattern compiles"))
}

/// Parse every `file:line:col: level: message` line of `text`.
///
/// Lines are trimmed before matching; everything else is ignored.
pub fn parse_diagnostics(text: &str) -> Vec<Diagnostic> {
    text.lines().filter_map(|line| parse_line(line.trim())).collect()
}

/// Diagnostics from a finished subprocess: stderr first, then stdout.
pub fn diagnostics_from_output(stdout: &str, stderr: &str) -> Vec<Diagnostic> {
    parse_diagnostics(&format!("{}\n{}", stderr, stdout))
}

fn parse_line(line: &str) -> Option<Diagnostic> {
    let caps = diagnostic_re().captures(line)?;
    Some(Diagnostic {
        file: caps["file"].to_string(),
        line: caps["line"].parse().ok()?,
        column: caps["col"].parse().ok()?,
        level: Severity::parse(&caps["level"])?,
        message: caps["msg"].to_string(),
        raw: line.to_string(),
    })
}
