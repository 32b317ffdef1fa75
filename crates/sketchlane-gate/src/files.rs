//! File name, size, and extension checks.
//!
//! Every name is checked twice: against a character whitelist and against
//! a blacklist of path and shell metacharacters. Either check failing
//! rejects the whole request.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;
use sketchlane_protocol::ops::NamedFile;

use crate::config::GateConfig;
use crate::result::RejectionReason;

/// Characters a file name may contain.
const SAFE_NAME_PATTERN: &str = r"^[A-Za-z0-9_./-]+$";

/// Fragments that are never allowed, even if the whitelist would pass them.
const DENIED_FRAGMENTS: &[&str] = &[
    "..", "~", "|", "\\", "%", "$", "{", "}", "[", "]", "`", "\"", "'", "?", "<", ">", "&",
];

/// Allowed extensions, lowercase and without the dot.
const ALLOWED_EXTENSIONS: &[&str] = &["ino", "pde", "c", "cpp", "h", "hpp", "s", "txt", "ld"];

/// Pattern for preprocessor define names.
const DEFINE_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

fn safe_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SAFE_NAME_PATTERN).expect("static pattern compiles"))
}

fn define_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DEFINE_NAME_PATTERN).expect("static pattern compiles"))
}

/// Check a relative file name.
///
/// Absolute paths and empty or `.` segments are rejected along with the
/// whitelist/blacklist failures, so the name always stays inside the
/// sketch directory once joined.
pub fn check_file_name(name: &str) -> Result<(), RejectionReason> {
    let unsafe_name = || RejectionReason::UnsafeFileName(name.to_string());

    if !safe_name_re().is_match(name) {
        return Err(unsafe_name());
    }
    if DENIED_FRAGMENTS.iter().any(|fragment| name.contains(fragment)) {
        return Err(unsafe_name());
    }
    if name.split('/').any(|segment| segment.is_empty() || segment == ".") {
        return Err(unsafe_name());
    }
    Ok(())
}

/// Check the extension of a (safe) file name.
///
/// Names without an extension pass: they cover build files such as
/// `Makefile`.
pub fn check_extension(name: &str) -> Result<(), RejectionReason> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty());

    match extension {
        Some(ext) if !ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            Err(RejectionReason::ExtensionNotAllowed(name.to_string()))
        }
        _ => Ok(()),
    }
}

/// Check one file against name, size, and extension rules.
pub fn check_file(file: &NamedFile, max_file_bytes: u64) -> Result<(), RejectionReason> {
    check_file_name(&file.name)?;

    let size = file.content.len() as u64;
    if size > max_file_bytes {
        return Err(RejectionReason::FileTooLarge {
            name: file.name.clone(),
            size,
            max: max_file_bytes,
        });
    }

    check_extension(&file.name)
}

/// Check the whole (already combined) file list.
pub fn check_files(files: &[NamedFile], config: &GateConfig) -> Result<(), RejectionReason> {
    if files.is_empty() {
        return Err(RejectionReason::NoFiles);
    }
    if files.len() > config.max_files {
        return Err(RejectionReason::TooManyFiles {
            count: files.len(),
            max: config.max_files,
        });
    }

    let mut seen = HashSet::new();
    for file in files {
        check_file(file, config.max_file_bytes)?;
        if !seen.insert(file.name.as_str()) {
            return Err(RejectionReason::DuplicateFile(file.name.clone()));
        }
    }
    Ok(())
}

/// Check the sketch (workspace) directory name: one safe path segment.
pub fn check_sketch_name(name: &str) -> Result<(), RejectionReason> {
    if name.contains('/') || check_file_name(name).is_err() {
        return Err(RejectionReason::InvalidSketchName(name.to_string()));
    }
    Ok(())
}

/// Check a preprocessor define name.
pub fn check_define_name(name: &str) -> Result<(), RejectionReason> {
    if !define_name_re().is_match(name) {
        return Err(RejectionReason::InvalidDefine(name.to_string()));
    }
    Ok(())
}
