//! Toolchain argument construction.

use std::path::Path;

use indexmap::IndexMap;
use sketchlane_protocol::ops::{CatalogKind, DefineValue, Warnings};

/// Environment variables passed to the toolchain; everything else is dropped.
pub const ENV_ALLOWLIST: &[&str] = &[
    "HOME",
    "PATH",
    "TMPDIR",
    "LANG",
    "LC_ALL",
    "LC_CTYPE",
    "USER",
    "LOGNAME",
];

/// Variable prefixes passed through (toolchain directories and settings).
pub const ENV_PREFIX_ALLOWLIST: &[&str] = &["ARDUINO_"];

/// Everything the compile command line depends on.
#[derive(Debug, Clone, Copy)]
pub struct CompileSpec<'a> {
    pub target: &'a str,
    pub warnings: Warnings,
    pub build_dir: &'a Path,
    pub output_dir: &'a Path,
    pub sketch_dir: &'a Path,
    pub defines: &'a IndexMap<String, DefineValue>,
    pub extra_flags: &'a [String],
    pub verbose: bool,
}

/// Join defines and extra flags into one compiler flag string.
///
/// Flag-valued defines render as `-DNAME`, the rest as `-DNAME=value`,
/// in request order, followed by the extra flags.
pub fn build_flags(defines: &IndexMap<String, DefineValue>, extra_flags: &[String]) -> String {
    defines
        .iter()
        .map(|(name, value)| {
            if value.is_flag() {
                format!("-D{}", name)
            } else {
                format!("-D{}={}", name, value)
            }
        })
        .chain(extra_flags.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arguments for `compile`.
pub fn compile_args(spec: &CompileSpec<'_>) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "compile".into(),
        "--fqbn".into(),
        spec.target.into(),
        "--warnings".into(),
        spec.warnings.as_str().into(),
        "--build-path".into(),
        spec.build_dir.display().to_string(),
        "--output-dir".into(),
        spec.output_dir.display().to_string(),
        "--export-binaries".into(),
        "--format".into(),
        "json".into(),
    ];

    let flags = build_flags(spec.defines, spec.extra_flags);
    if !flags.is_empty() {
        for property in ["compiler.c.extra_flags", "compiler.cpp.extra_flags"] {
            args.push("--build-property".into());
            args.push(format!("{}={}", property, flags));
        }
    }

    if spec.verbose {
        args.push("--verbose".into());
    }

    args.push(spec.sketch_dir.display().to_string());
    args
}

/// Arguments for `upload`.
pub fn upload_args(target: &str, port: &str, sketch_dir: &Path) -> Vec<String> {
    vec![
        "upload".into(),
        "--fqbn".into(),
        target.into(),
        "--port".into(),
        port.into(),
        sketch_dir.display().to_string(),
        "--format".into(),
        "json".into(),
    ]
}

/// Arguments for a catalog listing.
pub fn catalog_args(kind: CatalogKind) -> Vec<String> {
    kind.subcommand()
        .iter()
        .map(|s| s.to_string())
        .chain(["--format".to_string(), "json".to_string()])
        .collect()
}

/// Arguments for `version`.
pub fn version_args() -> Vec<String> {
    vec!["version".into(), "--format".into(), "json".into()]
}
