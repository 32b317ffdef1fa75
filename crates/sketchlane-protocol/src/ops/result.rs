//! Build and upload result schemas.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Return code reported when the toolchain is killed at its deadline.
///
/// Negative so it can never collide with a process exit status (0..=255)
/// or a signal-terminated status (128 + signal).
pub const TIMEOUT_RETURN_CODE: i32 = -1;

/// Captured outcome of one toolchain subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Exit status, or [`TIMEOUT_RETURN_CODE`] when the deadline fired.
    pub return_code: i32,
    /// Full standard output, never truncated.
    pub stdout: String,
    /// Full standard error, never truncated.
    pub stderr: String,
    /// Whether the deadline fired.
    #[serde(default)]
    pub timed_out: bool,
    /// Wall-clock duration of the subprocess.
    #[serde(default)]
    pub duration_ms: u64,
}

impl ProcessOutcome {
    /// Success iff the exit status is zero.
    pub fn succeeded(&self) -> bool {
        self.return_code == 0 && !self.timed_out
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "note" => Some(Severity::Note),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiler message line in structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub level: Severity,
    pub message: String,
    /// The matched line, trimmed.
    pub raw: String,
}

/// Artifact kinds extracted from the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Firmware image (Intel HEX).
    Hex,
    /// EEPROM image.
    Eep,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Hex, ArtifactKind::Eep];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Hex => "hex",
            ArtifactKind::Eep => "eep",
        }
    }
}

/// One extracted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Where the file was found.
    pub path: String,
    /// File content as text (Latin-1 decoded when not valid UTF-8).
    pub content: String,
    pub size_bytes: u64,
    /// SHA-256 of the raw bytes (hex).
    pub sha256: String,
}

/// Artifacts by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eep: Option<Artifact>,
}

impl Artifacts {
    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        match kind {
            ArtifactKind::Hex => self.hex.as_ref(),
            ArtifactKind::Eep => self.eep.as_ref(),
        }
    }

    pub fn set(&mut self, kind: ArtifactKind, artifact: Artifact) {
        match kind {
            ArtifactKind::Hex => self.hex = Some(artifact),
            ArtifactKind::Eep => self.eep = Some(artifact),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hex.is_none() && self.eep.is_none()
    }
}

/// Composed result of the compile phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildResult {
    #[serde(flatten)]
    pub outcome: ProcessOutcome,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub artifacts: Artifacts,
    /// The toolchain's JSON output, when stdout parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_json: Option<serde_json::Value>,
    /// `compiler_out` or `builder_result` from `result_json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<serde_json::Value>,
}

impl BuildResult {
    pub fn succeeded(&self) -> bool {
        self.outcome.succeeded()
    }
}

/// Response payload of the build operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResponse {
    /// Resolved target used for compilation.
    pub target: String,
    #[serde(rename = "sketchName")]
    pub sketch_name: String,
    #[serde(flatten)]
    pub result: BuildResult,
}

/// Composed result of the upload phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadPhase {
    #[serde(flatten)]
    pub outcome: ProcessOutcome,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_json: Option<serde_json::Value>,
}

/// Response payload of the upload operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub target: String,
    #[serde(rename = "sketchName")]
    pub sketch_name: String,
    pub port: String,
    /// Compile phase; always present.
    pub build: BuildResult,
    /// Upload phase; absent when the compile phase failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadPhase>,
}

impl UploadResponse {
    /// The outcome that decides the overall status: the compile phase when
    /// it failed, otherwise the upload phase.
    pub fn deciding_outcome(&self) -> &ProcessOutcome {
        match &self.upload {
            Some(upload) if self.build.succeeded() => &upload.outcome,
            _ => &self.build.outcome,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.build.succeeded() && self.upload.as_ref().is_some_and(|u| u.outcome.succeeded())
    }
}
