//! Sketchlane - sandboxed firmware build/upload lane
//!
//! This crate implements the `sketchlane` command-line front end: it
//! collects sketch sources from disk, hands them to the lane as RPC
//! requests, and renders the responses.

pub mod report;
pub mod sources;

pub use sketchlane_gate::{Gate, GateConfig};
pub use sketchlane_protocol::{ErrorCode, RpcError, RpcRequest, RpcResponse};
pub use sketchlane_worker::{LaneConfig, Pipeline, RpcHandler};
pub use sources::{load_sources, sketch_name_for, ExcludeRules, SourceError};
