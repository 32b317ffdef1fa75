//! Read-only toolchain listings (boards, cores, libraries, ports).

use std::time::Duration;

use serde_json::{json, Value};
use sketchlane_protocol::ops::CatalogKind;
use sketchlane_protocol::{ErrorCode, RpcError};
use thiserror::Error;

use crate::executor::command::catalog_args;
use crate::executor::{ExecutorError, Invoker};

/// Errors from a catalog listing.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("{message}")]
    Failed {
        message: String,
        return_code: i32,
        timed_out: bool,
    },

    #[error("JSON parse error: {message}")]
    Parse { message: String, raw: String },
}

impl From<CatalogError> for RpcError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Executor(err) => RpcError::internal(err.to_string()),
            CatalogError::Failed {
                message,
                return_code,
                timed_out: true,
            } => RpcError::with_data(ErrorCode::ToolchainTimeout, message, json!({ "return_code": return_code })),
            CatalogError::Failed {
                message, return_code, ..
            } => RpcError::toolchain_failed(message, return_code),
            CatalogError::Parse { message, raw } => RpcError::with_data(
                ErrorCode::Internal,
                format!("JSON parse error: {}", message),
                json!({ "raw": raw }),
            ),
        }
    }
}

/// Run one listing and return the toolchain's JSON verbatim.
///
/// Empty output yields an empty object.
pub fn list(invoker: &Invoker, kind: CatalogKind, timeout: Duration) -> Result<Value, CatalogError> {
    let outcome = invoker.run(&invoker.toolchain(catalog_args(kind), timeout))?;
    if !outcome.succeeded() {
        let message = if outcome.stderr.trim().is_empty() {
            outcome.stdout
        } else {
            outcome.stderr
        };
        return Err(CatalogError::Failed {
            message: message.trim().to_string(),
            return_code: outcome.return_code,
            timed_out: outcome.timed_out,
        });
    }
    parse_listing(&outcome.stdout)
}

fn parse_listing(stdout: &str) -> Result<Value, CatalogError> {
    if stdout.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(stdout).map_err(|e| CatalogError::Parse {
        message: e.to_string(),
        raw: stdout.to_string(),
    })
}
