//! Request envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Request envelope.
///
/// Every worker operation accepts a single JSON request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version. For probe requests, this MUST be 0.
    pub protocol_version: i32,
    /// Operation name.
    pub op: String,
    /// Caller-chosen request ID for correlation.
    pub request_id: String,
    /// Operation-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RpcRequest {
    /// Build a request for `op` with the current protocol version.
    pub fn new(op: impl Into<String>, request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            protocol_version: crate::PROTOCOL_MAX,
            op: op.into(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Decode the payload into an operation schema.
    ///
    /// Shape mismatches surface as INVALID_REQUEST naming the operation.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        let payload = if self.payload.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            self.payload.clone()
        };
        serde_json::from_value(payload)
            .map_err(|e| RpcError::invalid_request(format!("invalid {} request: {}", self.op, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BuildRequest;

    #[test]
    fn test_null_payload_is_empty_object() {
        let request: RpcRequest =
            serde_json::from_str(r#"{"protocol_version":1,"op":"build","request_id":"r1"}"#).unwrap();
        let build: BuildRequest = request.parse_payload().unwrap();
        assert!(build.files.is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_invalid_request() {
        let request = RpcRequest::new("build", "r2", serde_json::json!({ "files": "main.ino" }));
        let err = request.parse_payload::<BuildRequest>().unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::InvalidRequest);
        assert!(err.message.starts_with("invalid build request"));
    }

    #[test]
    fn test_define_order_survives_envelope() {
        let line = r#"{"protocol_version":1,"op":"build","request_id":"r3","payload":{"defines":{"ZED":1,"ALPHA":"9600","MID":true}}}"#;
        let request: RpcRequest = serde_json::from_str(line).unwrap();
        let build: BuildRequest = request.parse_payload().unwrap();
        let names: Vec<&str> = build.defines.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ZED", "ALPHA", "MID"]);

        let echoed = serde_json::to_string(&request).unwrap();
        assert!(echoed.contains(r#""defines":{"ZED":1,"ALPHA":"9600","MID":true}"#));
    }
}
