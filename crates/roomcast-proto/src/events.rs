//! Typed payloads for server-to-client events.
//!
//! Each struct is the `data` field of one envelope kind. Keeping them as
//! plain serde structs (rather than ad-hoc `json!` blobs at call sites)
//! gives clients a stable shape to deserialize against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ErrorCode;

/// `system` payload, sent once after a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    /// Id assigned to (or supplied by) this connection.
    pub connection_id: String,
    /// Resolved user identity, if the transport authenticated one.
    pub user_id: Option<String>,
    /// Whether a user identity is bound.
    pub authenticated: bool,
    /// Rooms the connection is currently in (empty on a fresh connect).
    pub rooms: Vec<String>,
}

/// `pong` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongEvent {
    /// Always `true`; present so the payload is self-identifying.
    pub pong: bool,
    /// Server wall-clock time of the reply.
    pub timestamp: DateTime<Utc>,
}

impl PongEvent {
    /// Build a pong reply for the given instant.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self { pong: true, timestamp }
    }
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

impl ErrorEvent {
    /// Build an error payload.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// `user_joined` / `user_left` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    /// Room whose membership changed.
    pub room: String,
    /// Connection that joined or left.
    pub connection_id: String,
    /// User bound to that connection, if any.
    pub user_id: Option<String>,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

/// Ack payload for `room_join` / `room_leave` requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAck {
    /// Room named in the request.
    pub room: String,
    /// Whether the operation took effect.
    pub success: bool,
    /// The requester's room list after the operation, sorted.
    pub rooms: Vec<String>,
}

/// Echo payload for personal `message` frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoEvent {
    /// Always `true`.
    pub echo: bool,
    /// The payload the client sent.
    pub original: Value,
}

impl EchoEvent {
    /// Echo back a client payload.
    pub fn of(original: Value) -> Self {
        Self { echo: true, original }
    }
}

/// `room_message` payload fanned out to room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessageEvent {
    /// Room the message targets.
    pub room: String,
    /// Connection id of the sender.
    pub sender: String,
    /// User bound to the sender, if any.
    pub user_id: Option<String>,
    /// Application payload.
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn system_event_shape() {
        let event = SystemEvent {
            connection_id: "c1".into(),
            user_id: Some("u1".into()),
            authenticated: true,
            rooms: vec![],
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "connection_id": "c1",
                "user_id": "u1",
                "authenticated": true,
                "rooms": [],
            })
        );
    }

    #[test]
    fn pong_is_self_identifying() {
        let event = PongEvent::at(Utc::now());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["pong"], true);
    }

    #[test]
    fn error_event_carries_code_and_message() {
        let event = ErrorEvent::new(ErrorCode::NotInRoom, "join the room first");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["code"], "NOT_IN_ROOM");
        assert_eq!(value["message"], "join the room first");
    }

    #[test]
    fn echo_preserves_original() {
        let event = EchoEvent::of(json!({"text": "hello"}));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["echo"], true);
        assert_eq!(value["original"], json!({"text": "hello"}));
    }
}
