//! Probe operation handler.
//!
//! Reports toolchain versions and the non-secret lane settings. Probe must
//! work with protocol_version 0 and never fails because a tool is missing.

use chrono::Utc;
use serde_json::json;
use sketchlane_protocol::ops::{names, LaneSettings, ProbeResponse};
use sketchlane_protocol::{RpcError, LANE_VERSION, PROTOCOL_MAX, PROTOCOL_MIN};

use crate::config::LaneConfig;
use crate::executor::Invoker;
use crate::probe::collect_versions;

use super::{to_payload, Lane, Reply};

/// Schema identifier of the probe payload.
pub const PROBE_SCHEMA_ID: &str = "sketchlane/probe@1";

/// Handle the probe operation.
pub fn handle(lane: &Lane) -> Result<Reply, RpcError> {
    let config = lane.config();
    let invoker = Invoker::new(config.invoker_config());

    let response = ProbeResponse {
        schema_version: 1,
        schema_id: PROBE_SCHEMA_ID.to_string(),
        created_at: Utc::now(),
        lane_version: LANE_VERSION.to_string(),
        protocol_min: PROTOCOL_MIN,
        protocol_max: PROTOCOL_MAX,
        operations: names::ALL.iter().map(|s| s.to_string()).collect(),
        versions: collect_versions(&invoker, config.catalog_timeout()),
        settings: settings(config),
    };

    to_payload(&response).map(Reply::Ok)
}

/// Settings safe to disclose.
pub fn settings(config: &LaneConfig) -> LaneSettings {
    let allowed_targets = if config.allowed_targets.is_empty() {
        json!("ANY")
    } else {
        json!(config.allowed_targets)
    };
    LaneSettings {
        toolchain: config.toolchain_path.display().to_string(),
        compile_timeout_seconds: config.compile_timeout_seconds,
        max_files: config.max_files,
        max_file_bytes: config.max_file_bytes,
        allowed_targets,
    }
}
