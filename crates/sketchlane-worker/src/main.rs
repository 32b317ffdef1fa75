//! Sketchlane Worker Entrypoint
//!
//! Usage: sketchlane-worker rpc
//!
//! Reads a single JSON RPC request from stdin, dispatches to the
//! appropriate handler, and writes a JSON response to stdout.
//! Configuration comes from `SKETCHLANE_CONFIG` (TOML) and the environment.

use std::path::PathBuf;
use std::process::ExitCode;

use sketchlane_worker::{init_logging, LaneConfig, RpcHandler, CONFIG_PATH_ENV};
use tracing::error;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] != "rpc" {
        eprintln!("Usage: sketchlane-worker rpc");
        eprintln!();
        eprintln!("Runs the RPC handler, reading JSON from stdin and writing to stdout.");
        return ExitCode::FAILURE;
    }

    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = match LaneConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(false);
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.debug);

    let handler = RpcHandler::new(config);
    if let Err(e) = handler.run() {
        error!(error = %e, "RPC handler error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
