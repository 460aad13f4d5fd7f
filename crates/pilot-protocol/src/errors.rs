//! Protocol error types and numeric wire codes.

use thiserror::Error;

// ── Wire error codes ────────────────────────────────────────────────

/// Request data is missing, of the wrong shape, or fails validation.
pub const INVALID_DATA: i32 = 400;
/// The request method is not served by the hub.
pub const UNKNOWN_METHOD: i32 = 404;

/// Failure to turn an inbound text frame into a protocol message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The frame is JSON but carries none of the three discriminators.
    #[error("frame is not a request, response or notification")]
    Unclassified,
}

/// Failure to deliver a frame to a peer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer's connection is gone and the frame was not queued.
    #[error("connection to {0} lost")]
    ConnectionLost(String),
    /// The outbound frame could not be serialized.
    #[error("failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A request handler's refusal, answered to the peer as an error response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Request data was malformed or missing required fields.
    #[error("{0}")]
    InvalidData(String),
    /// No handler is registered for the method.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
}

impl DispatchError {
    /// Shorthand for the generic "data is not an object" refusal.
    pub fn invalid_format() -> Self {
        Self::InvalidData("invalid data format".into())
    }

    /// Numeric code carried in the response's `errorCode`.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidData(_) => INVALID_DATA,
            Self::UnknownMethod(_) => UNKNOWN_METHOD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_data_code_and_reason() {
        let err = DispatchError::InvalidData("invalid msu id".into());
        assert_eq!(err.code(), 400);
        assert_eq!(err.to_string(), "invalid msu id");
    }

    #[test]
    fn unknown_method_code_and_reason() {
        let err = DispatchError::UnknownMethod("foo".into());
        assert_eq!(err.code(), 404);
        assert_eq!(err.to_string(), "unknown method: foo");
    }

    #[test]
    fn invalid_format_reason() {
        assert_eq!(DispatchError::invalid_format().to_string(), "invalid data format");
    }

    #[test]
    fn connection_lost_names_peer() {
        let err = SessionError::ConnectionLost("10.0.0.1:5000".into());
        assert_eq!(err.to_string(), "connection to 10.0.0.1:5000 lost");
    }

    #[test]
    fn json_error_converts_to_protocol_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: ProtocolError = json_err.into();
        assert!(matches!(err, ProtocolError::InvalidJson(_)));
    }
}
