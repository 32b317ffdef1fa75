//! Lane configuration.
//!
//! Loaded once at start-up in three layers: built-in defaults, an optional
//! TOML file, then environment overrides. The result is validated and never
//! mutated afterwards; each component receives the narrow view it needs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sketchlane_gate::{default_aliases, GateConfig};
use thiserror::Error;

use crate::executor::InvokerConfig;
use crate::workspace::WorkspaceConfig;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "SKETCHLANE_CONFIG";

/// Environment overrides, applied after the config file.
pub mod env {
    pub const TOOLCHAIN: &str = "ARDUINO_CLI";
    pub const COMPILE_TIMEOUT: &str = "COMPILE_TIMEOUT_S";
    pub const UPLOAD_TIMEOUT: &str = "UPLOAD_TIMEOUT_S";
    pub const MAX_FILES: &str = "MAX_FILES";
    pub const MAX_FILE_BYTES: &str = "MAX_FILE_BYTES";
    pub const ALLOWED_TARGETS: &str = "ALLOWED_FQBNS";
    pub const VERBOSE_COMPILE: &str = "VERBOSE_COMPILE";
    pub const DEBUG: &str = "DEBUG";
    pub const TEMP_ROOT: &str = "SKETCHLANE_TEMP_ROOT";
}

/// Upper bound for any timeout, in seconds.
const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Upload never gets less time than this, in seconds.
const MIN_UPLOAD_TIMEOUT_SECONDS: u64 = 120;

/// Toolchain executable name looked up on `PATH`.
const TOOLCHAIN_NAME: &str = "arduino-cli";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfBounds {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Process-wide lane settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Path to the toolchain executable.
    pub toolchain_path: PathBuf,

    /// Compile deadline (default: 120).
    pub compile_timeout_seconds: u64,

    /// Upload deadline (default: max(compile, 120)).
    pub upload_timeout_seconds: Option<u64>,

    /// Deadline for probe and catalog commands (default: 20).
    pub catalog_timeout_seconds: u64,

    /// Time between SIGTERM and SIGKILL when a deadline fires (default: 5).
    pub termination_grace_seconds: u64,

    /// Maximum files per request (default: 64).
    pub max_files: usize,

    /// Maximum bytes per file (default: 2 MiB).
    pub max_file_bytes: u64,

    /// Allowed targets (empty means any).
    pub allowed_targets: Vec<String>,

    /// Alias -> target.
    pub board_aliases: BTreeMap<String, String>,

    /// Pass `--verbose` to compile.
    pub verbose_compile: bool,

    /// Debug-level logging.
    pub debug: bool,

    /// Parent directory for workspaces (default: system temp dir).
    pub temp_root: Option<PathBuf>,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            toolchain_path: default_toolchain_path(),
            compile_timeout_seconds: 120,
            upload_timeout_seconds: None,
            catalog_timeout_seconds: 20,
            termination_grace_seconds: 5,
            max_files: 64,
            max_file_bytes: 2 * 1024 * 1024,
            allowed_targets: Vec::new(),
            board_aliases: default_aliases(),
            verbose_compile: false,
            debug: false,
            temp_root: None,
        }
    }
}

/// Prefer a toolchain shipped next to the worker binary, else `PATH`.
fn default_toolchain_path() -> PathBuf {
    let name = format!("{}{}", TOOLCHAIN_NAME, std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Parse a boolean the way shell users write them.
fn parse_env_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y" | "on"
    )
}

fn parse_env_number<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_target_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl LaneConfig {
    /// Load defaults, then `path` (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env::TOOLCHAIN).filter(|v| !v.trim().is_empty()) {
            self.toolchain_path = PathBuf::from(v.trim());
        }
        if let Some(v) = lookup(env::COMPILE_TIMEOUT) {
            self.compile_timeout_seconds = parse_env_number(env::COMPILE_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(env::UPLOAD_TIMEOUT) {
            self.upload_timeout_seconds = Some(parse_env_number(env::UPLOAD_TIMEOUT, &v)?);
        }
        if let Some(v) = lookup(env::MAX_FILES) {
            self.max_files = parse_env_number(env::MAX_FILES, &v)?;
        }
        if let Some(v) = lookup(env::MAX_FILE_BYTES) {
            self.max_file_bytes = parse_env_number(env::MAX_FILE_BYTES, &v)?;
        }
        if let Some(v) = lookup(env::ALLOWED_TARGETS) {
            self.allowed_targets = parse_target_list(&v);
        }
        if let Some(v) = lookup(env::VERBOSE_COMPILE) {
            self.verbose_compile = parse_env_bool(&v);
        }
        if let Some(v) = lookup(env::DEBUG) {
            self.debug = parse_env_bool(&v);
        }
        if let Some(v) = lookup(env::TEMP_ROOT).filter(|v| !v.trim().is_empty()) {
            self.temp_root = Some(PathBuf::from(v.trim()));
        }
        Ok(())
    }

    /// Check bounds on timeouts and limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_bounds("compile_timeout_seconds", self.compile_timeout_seconds, 1, MAX_TIMEOUT_SECONDS)?;
        if let Some(upload) = self.upload_timeout_seconds {
            check_bounds("upload_timeout_seconds", upload, 1, MAX_TIMEOUT_SECONDS)?;
        }
        check_bounds("catalog_timeout_seconds", self.catalog_timeout_seconds, 1, MAX_TIMEOUT_SECONDS)?;
        check_bounds("termination_grace_seconds", self.termination_grace_seconds, 0, 300)?;
        check_bounds("max_files", self.max_files as u64, 1, u32::MAX as u64)?;
        check_bounds("max_file_bytes", self.max_file_bytes, 1, u64::MAX)?;
        Ok(())
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_seconds)
    }

    pub fn upload_timeout(&self) -> Duration {
        let seconds = self
            .upload_timeout_seconds
            .unwrap_or_else(|| self.compile_timeout_seconds.max(MIN_UPLOAD_TIMEOUT_SECONDS));
        Duration::from_secs(seconds)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_seconds)
    }

    /// View consumed by the gate.
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            max_files: self.max_files,
            max_file_bytes: self.max_file_bytes,
            allowed_targets: self.allowed_targets.clone(),
            board_aliases: self.board_aliases.clone(),
        }
    }

    /// View consumed by the toolchain invoker.
    pub fn invoker_config(&self) -> InvokerConfig {
        InvokerConfig {
            toolchain_path: self.toolchain_path.clone(),
            termination_grace: Duration::from_secs(self.termination_grace_seconds),
        }
    }

    /// View consumed by the workspace manager.
    pub fn workspace_config(&self) -> WorkspaceConfig {
        WorkspaceConfig {
            temp_root: self.temp_root.clone(),
        }
    }
}

fn check_bounds(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfBounds { field, value, min, max });
    }
    Ok(())
}
