//! The normalized response envelope shared by every transport
//!
//! All three transports reduce their native results - an HTTP response, a
//! subprocess exit, an SSH exec - to the same [`ApiResponse`] shape. No
//! transport is allowed to let a native fault cross the backend boundary;
//! faults are caught and converted to a failed envelope instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel status code used when the native layer produced none
/// (connection refused, spawn failure, killed by signal).
pub const STATUS_UNAVAILABLE: i64 = -1;

/// Normalized result of one transport call.
///
/// `status_code` keeps its transport-native meaning: an HTTP status for the
/// HTTPS backend, a process exit code for the CLI backend, a shell exit
/// status for the SSH backend. `success` is the transport-normalized
/// verdict (`< 400` for HTTP, `== 0` for exit codes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Decoded payload; present only on success. Plain-text output that is
    /// not valid JSON is carried here as a string, not treated as an error.
    pub data: Option<Value>,
    /// Transport-native status
    pub status_code: i64,
    /// Transport-normalized verdict
    pub success: bool,
    /// Short diagnostic, present on failure
    pub error: Option<String>,
}

impl ApiResponse {
    /// Successful envelope carrying a decoded payload
    #[must_use]
    pub fn success(status_code: i64, data: Option<Value>) -> Self {
        Self {
            data,
            status_code,
            success: true,
            error: None,
        }
    }

    /// Failed envelope with a native status code and a diagnostic
    #[must_use]
    pub fn failure(status_code: i64, error: impl Into<String>) -> Self {
        Self {
            data: None,
            status_code,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Failed envelope for faults with no native status code at all
    #[must_use]
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self::failure(STATUS_UNAVAILABLE, error)
    }

    /// Decode raw transport output into a payload value.
    ///
    /// Empty output yields `None`; output that parses as JSON yields the
    /// parsed value; anything else is returned as a raw string, since the
    /// remote service occasionally answers valid requests with plain text.
    #[must_use]
    pub fn decode_output(raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str(trimmed) {
            Ok(value) => Some(value),
            Err(_) => Some(Value::String(trimmed.to_string())),
        }
    }
}
