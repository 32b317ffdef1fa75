//! Toolchain version detection.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex_lite::Regex;
use sketchlane_protocol::ops::ToolVersions;
use tracing::debug;

use crate::executor::command::version_args;
use crate::executor::{Invocation, Invoker};

/// Reported when the toolchain cannot be run or fails.
pub const TOOLCHAIN_UNAVAILABLE: &str = "not found or error";

/// Reported when the avr-libc version cannot be detected.
pub const AVR_LIBC_UNKNOWN: &str = "avr-libc unknown";

const COMPANION_TIMEOUT: Duration = Duration::from_secs(10);

fn avr_libc_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"__AVR_LIBC_VERSION_STRING__\s+"(.+)""#).expect("static pattern compiles")
    })
}

/// Locate an executable on `path_var` (a `PATH`-style list).
pub fn find_on_path(name: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let path_var = path_var?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(format!("{}{}", name, env::consts::EXE_SUFFIX)))
        .find(|candidate| candidate.is_file())
}

/// Collect the versions of the toolchain and its companion tools.
pub fn collect_versions(invoker: &Invoker, timeout: Duration) -> ToolVersions {
    let path_var = env::var_os("PATH");
    let gcc = find_on_path("avr-gcc", path_var.clone());
    let ld = find_on_path("avr-ld", path_var);

    ToolVersions {
        arduino_cli: toolchain_version(invoker, timeout),
        avr_gcc: gcc.as_deref().map(|p| first_version_line(invoker, p)),
        avr_ld: ld.as_deref().map(|p| first_version_line(invoker, p)),
        avr_libc: gcc
            .as_deref()
            .and_then(|p| detect_avr_libc(invoker, p))
            .unwrap_or_else(|| AVR_LIBC_UNKNOWN.to_string()),
    }
}

fn toolchain_version(invoker: &Invoker, timeout: Duration) -> String {
    let outcome = match invoker.run(&invoker.toolchain(version_args(), timeout)) {
        Ok(outcome) if outcome.succeeded() => outcome,
        Ok(outcome) => {
            debug!(return_code = outcome.return_code, "toolchain version failed");
            return TOOLCHAIN_UNAVAILABLE.to_string();
        }
        Err(e) => {
            debug!(error = %e, "toolchain version failed");
            return TOOLCHAIN_UNAVAILABLE.to_string();
        }
    };
    parse_toolchain_version(&outcome.stdout, &outcome.stderr)
}

/// `VersionString`, else `Version`, else the first line of output.
pub fn parse_toolchain_version(stdout: &str, stderr: &str) -> String {
    let json_source = if stdout.trim().is_empty() { "{}" } else { stdout };
    match serde_json::from_str::<serde_json::Value>(json_source) {
        Ok(value) => ["VersionString", "Version"]
            .iter()
            .filter_map(|key| value.get(key).and_then(|v| v.as_str()))
            .find(|v| !v.is_empty())
            .unwrap_or("unknown")
            .to_string(),
        Err(_) => {
            let text = if stdout.is_empty() { stderr } else { stdout };
            text.trim().lines().next().unwrap_or("unknown").to_string()
        }
    }
}

fn first_version_line(invoker: &Invoker, program: &Path) -> String {
    let invocation = Invocation::new(program, vec!["--version".to_string()], COMPANION_TIMEOUT);
    invoker
        .run(&invocation)
        .ok()
        .and_then(|outcome| outcome.stdout.lines().next().map(str::to_string))
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Scan the compiler's include search list for `avr/version.h`.
fn detect_avr_libc(invoker: &Invoker, gcc: &Path) -> Option<String> {
    let args = ["-E", "-Wp,-v", "-"].iter().map(|s| s.to_string()).collect();
    let outcome = invoker.run(&Invocation::new(gcc, args, COMPANION_TIMEOUT)).ok()?;
    if !outcome.succeeded() {
        return None;
    }
    include_dirs(&outcome.stderr)
        .iter()
        .find_map(|dir| read_avr_libc_version(&dir.join("avr").join("version.h")))
}

/// Directories listed after `#include "..." search starts here:`.
pub fn include_dirs(preprocessor_stderr: &str) -> Vec<PathBuf> {
    preprocessor_stderr
        .lines()
        .skip_while(|line| line.trim() != "#include \"...\" search starts here:")
        .skip(1)
        .take_while(|line| line.trim() != "End of search list.")
        .filter(|line| line.starts_with(char::is_whitespace))
        .map(|line| PathBuf::from(line.trim()))
        .collect()
}

pub fn read_avr_libc_version(version_h: &Path) -> Option<String> {
    let bytes = fs::read(version_h).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    let caps = avr_libc_version_re().captures(&text)?;
    Some(format!("avr-libc {}", &caps[1]))
}
