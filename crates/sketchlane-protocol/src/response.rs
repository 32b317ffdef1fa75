//! Response envelope.

use serde::{Deserialize, Serialize};
use crate::error::RpcError;

/// Response envelope.
///
/// Every worker operation emits a single JSON response. A toolchain
/// failure carries both `error` and the full result in `payload`, so the
/// caller always sees the captured diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version (echoed from request, or 0 for probe).
    pub protocol_version: i32,
    /// Request ID echoed from the request.
    pub request_id: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// HTTP-equivalent status.
    pub status: u16,
    /// Result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error details (present when ok=false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(protocol_version: i32, request_id: String, payload: serde_json::Value) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: true,
            status: 200,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(protocol_version: i32, request_id: String, error: RpcError) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: false,
            status: error.status(),
            payload: None,
            error: Some(error),
        }
    }

    /// Create an error response that still carries a result payload.
    pub fn failure(
        protocol_version: i32,
        request_id: String,
        error: RpcError,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            payload: Some(payload),
            ..Self::error(protocol_version, request_id, error)
        }
    }
}
