//! Build and upload request schemas.
//!
//! These mirror the JSON accepted by the lane. Every field is optional at
//! the wire level; the gate normalizes and validates them before any file
//! is written.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A source file supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFile {
    /// Relative path inside the sketch directory.
    pub name: String,
    /// UTF-8 text content.
    pub content: String,
}

impl NamedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Compiler warning level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Warnings {
    None,
    #[default]
    Default,
    More,
    All,
}

impl Warnings {
    pub fn as_str(&self) -> &'static str {
        match self {
            Warnings::None => "none",
            Warnings::Default => "default",
            Warnings::More => "more",
            Warnings::All => "all",
        }
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a preprocessor define.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefineValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DefineValue {
    /// Whether the define renders as a bare `-DNAME`.
    ///
    /// `true` and numeric one are flags; the string `"1"` is a value.
    pub fn is_flag(&self) -> bool {
        match self {
            DefineValue::Bool(b) => *b,
            DefineValue::Int(i) => *i == 1,
            DefineValue::Float(f) => *f == 1.0,
            DefineValue::Text(_) => false,
        }
    }
}

impl fmt::Display for DefineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefineValue::Bool(b) => write!(f, "{}", u8::from(*b)),
            DefineValue::Int(i) => write!(f, "{}", i),
            DefineValue::Float(x) => write!(f, "{}", x),
            DefineValue::Text(s) => f.write_str(s),
        }
    }
}

/// Build request payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Inline main sketch source (shorthand for a single `.ino` file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sketch: Option<String>,
    /// Explicit files, in order.
    #[serde(default)]
    pub files: Vec<NamedFile>,
    /// Sketch (workspace) directory name.
    #[serde(default, rename = "sketchName", skip_serializing_if = "Option::is_none")]
    pub sketch_name: Option<String>,
    /// Explicit target string; wins over `board`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqbn: Option<String>,
    /// Board alias or literal target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(default)]
    pub warnings: Warnings,
    /// Preprocessor defines, in request order.
    #[serde(default)]
    pub defines: IndexMap<String, DefineValue>,
    /// Extra compiler flags appended after the defines.
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

/// Upload request payload: a build request plus the device port.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadRequest {
    #[serde(flatten)]
    pub build: BuildRequest,
    /// Serial port of the device (required).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}
