//! Probe operation types.
//!
//! The probe operation reports toolchain versions and the lane's
//! non-secret settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Probe response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResponse {
    /// Schema version.
    pub schema_version: i32,
    /// Schema identifier.
    pub schema_id: String,
    /// When this snapshot was created.
    pub created_at: DateTime<Utc>,
    /// Lane version running on the worker.
    pub lane_version: String,
    /// Minimum protocol version supported.
    pub protocol_min: i32,
    /// Maximum protocol version supported.
    pub protocol_max: i32,
    /// Operations answered by this worker.
    pub operations: Vec<String>,
    pub versions: ToolVersions,
    pub settings: LaneSettings,
}

/// Versions of the external tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolVersions {
    /// Toolchain version, or "not found or error".
    pub arduino_cli: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avr_gcc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avr_ld: Option<String>,
    /// e.g. "avr-libc 2.0.0", or "avr-libc unknown".
    pub avr_libc: String,
}

/// Settings safe to disclose to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneSettings {
    pub toolchain: String,
    pub compile_timeout_seconds: u64,
    pub max_files: usize,
    pub max_file_bytes: u64,
    /// Allowed targets, or the string "ANY" when unrestricted.
    pub allowed_targets: serde_json::Value,
}
