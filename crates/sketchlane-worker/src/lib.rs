//! Sketchlane Worker
//!
//! Stages untrusted sketch sources into a throwaway workspace, runs
//! arduino-cli on them under a deadline, and composes the result.
//!
//! This crate can be used in two modes:
//! - **Standalone binary**: `sketchlane-worker rpc`, one JSON request on
//!   stdin, one JSON response on stdout
//! - **In-process library**: [`Pipeline`] for the CLI and for tests

pub mod artifacts;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod executor;
pub mod handlers;
pub mod logging;
pub mod pipeline;
pub mod probe;
pub mod rpc;
pub mod workspace;

pub use catalog::CatalogError;
pub use config::{ConfigError, LaneConfig, CONFIG_PATH_ENV};
pub use executor::{ExecutorError, Invocation, Invoker, InvokerConfig};
pub use logging::init_logging;
pub use pipeline::{Pipeline, PipelineError};
pub use rpc::RpcHandler;
pub use workspace::{Workspace, WorkspaceConfig, WorkspaceError};
