//! Error codes and error types for the wire contract.
//!
//! [`ErrorCode`] is the closed set of machine-readable codes carried in
//! `error` frames. [`FrameError`] explains why an inbound frame was rejected
//! and maps onto exactly one code. [`ProtocolError`] covers encoding
//! failures on the outbound path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable codes carried in the `data.code` field of `error`
/// frames.
///
/// The set is closed: transports and clients can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A frame that requires a `room` field omitted it.
    MissingRoom,
    /// The sender tried to message a room it has not joined.
    NotInRoom,
    /// The frame's `type` tag is not part of the protocol.
    UnknownType,
    /// The frame was not valid JSON.
    InvalidJson,
    /// Unexpected failure while handling an otherwise valid frame.
    InternalError,
}

impl ErrorCode {
    /// Wire name of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingRoom => "MISSING_ROOM",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::UnknownType => "UNKNOWN_TYPE",
            Self::InvalidJson => "INVALID_JSON",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an inbound client frame was rejected.
///
/// Rejections are non-fatal: the hub replies with an `error` frame and the
/// connection stays open.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The text was not valid JSON.
    #[error("malformed JSON: {0}")]
    InvalidJson(String),

    /// The `type` tag is not part of the protocol.
    #[error("unrecognized message type: {0:?}")]
    UnknownType(String),

    /// A `room` field was required but absent.
    #[error("missing required field `room` for {0}")]
    MissingRoom(&'static str),
}

impl FrameError {
    /// The wire error code for this rejection.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidJson(_) => ErrorCode::InvalidJson,
            Self::UnknownType(_) => ErrorCode::UnknownType,
            Self::MissingRoom(_) => ErrorCode::MissingRoom,
        }
    }
}

/// Outbound encoding failures.
///
/// These indicate a bug (an unserializable payload), not a peer problem, so
/// callers log them and drop the frame rather than tearing anything down.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_to_codes() {
        assert_eq!(FrameError::InvalidJson("eof".into()).code(), ErrorCode::InvalidJson);
        assert_eq!(FrameError::UnknownType("nope".into()).code(), ErrorCode::UnknownType);
        assert_eq!(FrameError::MissingRoom("room_join").code(), ErrorCode::MissingRoom);
    }

    #[test]
    fn error_codes_serialize_screaming_snake() {
        let encoded = serde_json::to_string(&ErrorCode::NotInRoom).unwrap();
        assert_eq!(encoded, "\"NOT_IN_ROOM\"");

        let decoded: ErrorCode = serde_json::from_str("\"MISSING_ROOM\"").unwrap();
        assert_eq!(decoded, ErrorCode::MissingRoom);
    }
}
