//! Operation handlers for the worker RPC.
//!
//! Each operation has its own handler module. Handlers return a [`Reply`]
//! so a toolchain failure can carry its full result next to the error.

pub mod build;
pub mod catalog;
pub mod probe;
pub mod upload;

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sketchlane_protocol::ops::ProcessOutcome;
use sketchlane_protocol::RpcError;

use tracing::{error, info};

use crate::config::LaneConfig;
use crate::pipeline::{Pipeline, PipelineError};

/// Shared, immutable state every handler reads.
#[derive(Debug, Clone)]
pub struct Lane {
    config: LaneConfig,
    pipeline: Pipeline,
}

impl Lane {
    pub fn new(config: LaneConfig) -> Self {
        let pipeline = Pipeline::new(&config);
        Self { config, pipeline }
    }

    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Handler output.
#[derive(Debug)]
pub enum Reply {
    /// The operation succeeded.
    Ok(Value),
    /// The toolchain ran and failed; `payload` holds the full result.
    Failed { error: RpcError, payload: Value },
}

/// Serialize a payload for the response envelope.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::internal(format!("failed to serialize response: {}", e)))
}

/// Log a pipeline error at the right level and convert it for the wire.
pub(crate) fn pipeline_error(err: PipelineError) -> RpcError {
    match &err {
        PipelineError::Rejected(reason) => info!(reason = %reason, "request rejected"),
        PipelineError::Workspace(_) | PipelineError::Executor(_) => error!(error = %err, "pipeline failed"),
    }
    err.into()
}

/// Error describing a failed toolchain outcome.
pub(crate) fn toolchain_error(outcome: &ProcessOutcome, timeout: Duration) -> RpcError {
    if outcome.timed_out {
        RpcError::toolchain_timeout(timeout.as_secs())
    } else {
        RpcError::toolchain_failed(
            format!("toolchain exited with status {}", outcome.return_code),
            outcome.return_code,
        )
    }
}
