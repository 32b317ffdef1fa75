//! Gate decision types.

use serde::{Deserialize, Serialize};
use sketchlane_protocol::ops::{DefineValue, NamedFile, Warnings};
use sketchlane_protocol::{ErrorCode, RpcError};
use indexmap::IndexMap;

/// Machine-readable rejection reason.
///
/// The `Display` text is the human-readable reason returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "detail")]
pub enum RejectionReason {
    /// Neither inline source nor files were supplied.
    #[serde(rename = "NO_FILES")]
    #[error("'files' must be a non-empty list of {{name, content}}")]
    NoFiles,

    /// File count exceeds the configured maximum.
    #[serde(rename = "TOO_MANY_FILES")]
    #[error("Too many files ({count} > {max})")]
    TooManyFiles { count: usize, max: usize },

    /// File name fails the whitelist or hits the blacklist.
    #[serde(rename = "UNSAFE_FILE_NAME")]
    #[error("Unsafe filename: {0}")]
    UnsafeFileName(String),

    /// Two files map to the same path.
    #[serde(rename = "DUPLICATE_FILE")]
    #[error("Duplicate filename: {0}")]
    DuplicateFile(String),

    /// File content is too large.
    #[serde(rename = "FILE_TOO_LARGE")]
    #[error("File too large: {name} ({size} > {max} bytes)")]
    FileTooLarge { name: String, size: u64, max: u64 },

    /// Extension outside the allowed set.
    #[serde(rename = "EXTENSION_NOT_ALLOWED")]
    #[error("Extension not allowed: {0}")]
    ExtensionNotAllowed(String),

    /// Sketch name is not a single safe path segment.
    #[serde(rename = "INVALID_SKETCH_NAME")]
    #[error("Invalid sketchName: {0}")]
    InvalidSketchName(String),

    /// Define name is not a preprocessor identifier.
    #[serde(rename = "INVALID_DEFINE")]
    #[error("Invalid define name: {0}")]
    InvalidDefine(String),

    /// Upload request without a port.
    #[serde(rename = "MISSING_PORT")]
    #[error("'port' is required for upload")]
    MissingPort,

    /// Explicit target was empty after trimming.
    #[serde(rename = "EMPTY_TARGET")]
    #[error("'fqbn' must not be empty")]
    EmptyTarget,

    /// Resolved target is not allow-listed.
    #[serde(rename = "TARGET_NOT_ALLOWED")]
    #[error("FQBN '{0}' not allowed")]
    TargetNotAllowed(String),
}

impl RejectionReason {
    /// Whether this came from target resolution rather than input validation.
    pub fn is_resolution(&self) -> bool {
        matches!(self, RejectionReason::TargetNotAllowed(_))
    }

    /// Wire error code for this rejection.
    pub fn code(&self) -> ErrorCode {
        if self.is_resolution() {
            ErrorCode::TargetNotAllowed
        } else {
            ErrorCode::InvalidRequest
        }
    }
}

impl From<RejectionReason> for RpcError {
    fn from(reason: RejectionReason) -> Self {
        let data = serde_json::to_value(&reason).ok();
        RpcError {
            code: reason.code(),
            message: reason.to_string(),
            data,
        }
    }
}

/// Canonical target string handed verbatim to the toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedTarget(String);

impl ResolvedTarget {
    pub(crate) fn new(target: String) -> Self {
        Self(target)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A build request that passed the gate.
#[derive(Debug, Clone)]
pub struct AdmittedBuild {
    /// Validated files, inline sketch included.
    pub files: Vec<NamedFile>,
    pub sketch_name: String,
    pub target: ResolvedTarget,
    pub warnings: Warnings,
    pub defines: IndexMap<String, DefineValue>,
    pub extra_flags: Vec<String>,
}

/// An upload request that passed the gate.
#[derive(Debug, Clone)]
pub struct AdmittedUpload {
    pub build: AdmittedBuild,
    pub port: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            RejectionReason::TooManyFiles { count: 65, max: 64 }.to_string(),
            "Too many files (65 > 64)"
        );
        assert_eq!(
            RejectionReason::UnsafeFileName("../x.ino".to_string()).to_string(),
            "Unsafe filename: ../x.ino"
        );
        assert_eq!(
            RejectionReason::NoFiles.to_string(),
            "'files' must be a non-empty list of {name, content}"
        );
    }

    #[test]
    fn test_resolution_maps_to_target_not_allowed() {
        let err: RpcError = RejectionReason::TargetNotAllowed("x:y:z".to_string()).into();
        assert_eq!(err.code, ErrorCode::TargetNotAllowed);
        assert_eq!(err.message, "FQBN 'x:y:z' not allowed");

        let err: RpcError = RejectionReason::MissingPort.into();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(err.data.unwrap()["type"], "MISSING_PORT");
    }
}
