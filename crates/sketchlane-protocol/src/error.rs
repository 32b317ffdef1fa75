//! Error types for the request envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes returned in error responses.
///
/// These codes are stable and used for automation. Each maps onto an
/// HTTP-equivalent status so a routing layer can forward it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed JSON, missing required fields, or unsafe request contents.
    InvalidRequest,
    /// The resolved target is not on the configured allow-list.
    TargetNotAllowed,
    /// Protocol version is outside the supported range.
    UnsupportedProtocol,
    /// Unknown operation requested.
    UnknownOperation,
    /// Request exceeds the maximum accepted size.
    PayloadTooLarge,
    /// The toolchain ran and rejected the input (non-zero exit).
    ToolchainFailed,
    /// The toolchain did not finish before its deadline.
    ToolchainTimeout,
    /// Anything else: I/O failures, spawn failures, serialization.
    Internal,
}

impl ErrorCode {
    /// HTTP-equivalent status for this code.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidRequest
            | Self::TargetNotAllowed
            | Self::UnsupportedProtocol
            | Self::UnknownOperation
            | Self::ToolchainFailed => 400,
            Self::PayloadTooLarge => 413,
            Self::ToolchainTimeout => 504,
            Self::Internal => 500,
        }
    }

    /// Whether the caller is at fault (as opposed to the infrastructure).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::TargetNotAllowed => write!(f, "TARGET_NOT_ALLOWED"),
            Self::UnsupportedProtocol => write!(f, "UNSUPPORTED_PROTOCOL"),
            Self::UnknownOperation => write!(f, "UNKNOWN_OPERATION"),
            Self::PayloadTooLarge => write!(f, "PAYLOAD_TOO_LARGE"),
            Self::ToolchainFailed => write!(f, "TOOLCHAIN_FAILED"),
            Self::ToolchainTimeout => write!(f, "TOOLCHAIN_TIMEOUT"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Error response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code from the registry.
    pub code: ErrorCode,
    /// Human-readable, single-line error message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new error with additional data.
    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create a TARGET_NOT_ALLOWED error.
    pub fn target_not_allowed(target: &str) -> Self {
        Self::with_data(
            ErrorCode::TargetNotAllowed,
            format!("FQBN '{}' not allowed", target),
            serde_json::json!({ "target": target }),
        )
    }

    /// Create an UNSUPPORTED_PROTOCOL error.
    pub fn unsupported_protocol(version: i32, min: i32, max: i32) -> Self {
        Self::with_data(
            ErrorCode::UnsupportedProtocol,
            format!("protocol_version {} is outside supported range [{}, {}]", version, min, max),
            serde_json::json!({
                "requested": version,
                "min": min,
                "max": max
            }),
        )
    }

    /// Create an UNKNOWN_OPERATION error.
    pub fn unknown_operation(op: &str) -> Self {
        Self::with_data(
            ErrorCode::UnknownOperation,
            format!("unknown operation: {}", op),
            serde_json::json!({ "op": op }),
        )
    }

    /// Create a PAYLOAD_TOO_LARGE error.
    pub fn payload_too_large(size: u64, max: u64) -> Self {
        Self::with_data(
            ErrorCode::PayloadTooLarge,
            format!("payload size {} exceeds maximum {}", size, max),
            serde_json::json!({ "size": size, "max_bytes": max }),
        )
    }

    /// Create a TOOLCHAIN_FAILED error for a non-zero exit.
    pub fn toolchain_failed(message: impl Into<String>, return_code: i32) -> Self {
        Self::with_data(
            ErrorCode::ToolchainFailed,
            message,
            serde_json::json!({ "return_code": return_code }),
        )
    }

    /// Create a TOOLCHAIN_TIMEOUT error.
    pub fn toolchain_timeout(timeout_seconds: u64) -> Self {
        Self::with_data(
            ErrorCode::ToolchainTimeout,
            format!("toolchain did not finish within {}s", timeout_seconds),
            serde_json::json!({ "timeout_seconds": timeout_seconds }),
        )
    }

    /// Create an INTERNAL error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// HTTP-equivalent status of this error.
    pub fn status(&self) -> u16 {
        self.code.status()
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::TargetNotAllowed).unwrap();
        assert_eq!(json, "\"TARGET_NOT_ALLOWED\"");
        assert_eq!(ErrorCode::ToolchainTimeout.to_string(), "TOOLCHAIN_TIMEOUT");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.status(), 400);
        assert_eq!(ErrorCode::TargetNotAllowed.status(), 400);
        assert_eq!(ErrorCode::ToolchainFailed.status(), 400);
        assert_eq!(ErrorCode::ToolchainTimeout.status(), 504);
        assert_eq!(ErrorCode::Internal.status(), 500);
        assert!(ErrorCode::InvalidRequest.is_client_error());
        assert!(!ErrorCode::Internal.is_client_error());
    }

    #[test]
    fn test_target_not_allowed_message() {
        let err = RpcError::target_not_allowed("x:y:z");
        assert_eq!(err.message, "FQBN 'x:y:z' not allowed");
        assert_eq!(err.data.unwrap()["target"], "x:y:z");
    }

    #[test]
    fn test_display() {
        let err = RpcError::invalid_request("Unsafe filename: ../x.ino");
        assert_eq!(err.to_string(), "INVALID_REQUEST: Unsafe filename: ../x.ino");
    }
}
