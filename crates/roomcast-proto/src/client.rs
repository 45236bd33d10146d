//! Inbound client frames.
//!
//! The transport hands the hub raw text; [`ClientFrame::parse`] turns it
//! into a closed enum so dispatch is an exhaustive match rather than string
//! comparison scattered across handlers. Unrecognized `type` tags are a
//! distinct failure from malformed JSON because the client gets a different
//! error code for each.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::FrameError;

/// Intermediate shape of an inbound frame before type-tag dispatch.
///
/// `room` and `data` are optional here; requiredness depends on the tag and
/// is enforced by [`ClientFrame::parse`].
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// A decoded client-to-hub frame.
///
/// Every protocol operation a client can request is a variant here; adding
/// one forces every dispatch site to handle it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// Liveness ping.
    Ping,
    /// Join a named room.
    RoomJoin {
        /// Room to join.
        room: String,
    },
    /// Leave a named room.
    RoomLeave {
        /// Room to leave.
        room: String,
    },
    /// Fan a payload out to a room (sender excluded).
    RoomMessage {
        /// Target room.
        room: String,
        /// Payload to fan out.
        data: Value,
    },
    /// Personal message; the hub echoes it back to the sender.
    Message {
        /// Payload to echo.
        data: Value,
    },
}

impl ClientFrame {
    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// - [`FrameError::InvalidJson`] if the text is not a JSON object with a
    ///   string `type` field
    /// - [`FrameError::UnknownType`] for a tag outside the protocol
    /// - [`FrameError::MissingRoom`] when a room-scoped tag omits `room`
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame =
            serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;

        match raw.kind.as_str() {
            "ping" => Ok(Self::Ping),
            "room_join" => {
                let room = raw.room.ok_or(FrameError::MissingRoom("room_join"))?;
                Ok(Self::RoomJoin { room })
            },
            "room_leave" => {
                let room = raw.room.ok_or(FrameError::MissingRoom("room_leave"))?;
                Ok(Self::RoomLeave { room })
            },
            "room_message" => {
                let room = raw.room.ok_or(FrameError::MissingRoom("room_message"))?;
                Ok(Self::RoomMessage { room, data: raw.data.unwrap_or(Value::Null) })
            },
            "message" => Ok(Self::Message { data: raw.data.unwrap_or(Value::Null) }),
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}
