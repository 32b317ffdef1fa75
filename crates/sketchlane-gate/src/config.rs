//! Gate configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alias used when a request names neither a target nor a board.
pub const DEFAULT_BOARD: &str = "uno";

/// Built-in board aliases.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("uno", "arduino:avr:uno"),
    ("nano", "arduino:avr:nano"),
    ("mega", "arduino:avr:mega"),
    ("leonardo", "arduino:avr:leonardo"),
    ("uno-wifi-rev2", "arduino:megaavr:uno2018"),
];

/// Build the default alias table.
pub fn default_aliases() -> BTreeMap<String, String> {
    DEFAULT_ALIASES
        .iter()
        .map(|(alias, target)| (alias.to_string(), target.to_string()))
        .collect()
}

/// Limits and target policy consulted by the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum number of files after the inline sketch is folded in.
    pub max_files: usize,

    /// Maximum UTF-8 byte length of a single file.
    pub max_file_bytes: u64,

    /// Allowed targets (empty means any target is allowed).
    #[serde(default)]
    pub allowed_targets: Vec<String>,

    /// Alias -> canonical target.
    #[serde(default = "default_aliases")]
    pub board_aliases: BTreeMap<String, String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_files: 64,
            max_file_bytes: 2 * 1024 * 1024,
            allowed_targets: Vec::new(),
            board_aliases: default_aliases(),
        }
    }
}
