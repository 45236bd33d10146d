//! JSON wire envelope.
//!
//! The envelope is the only framing the hub knows about. The `type` field
//! identifies the event, `data` carries the event payload, and `timestamp`
//! is the server wall-clock time in ISO-8601 (RFC 3339) form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;

/// Event kinds the hub emits to clients (plus the request-mirroring acks).
///
/// Client-originated frame kinds are parsed separately into
/// [`crate::ClientFrame`]; this enum covers the server-to-client direction
/// only, so an exhaustive match here cannot silently drop an outbound kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Sent once after a successful connect.
    System,
    /// Heartbeat reply.
    Pong,
    /// Non-fatal error frame; the connection stays open.
    Error,
    /// Room membership notification: a peer joined.
    UserJoined,
    /// Room membership notification: a peer left.
    UserLeft,
    /// Message fanned out to a room.
    RoomMessage,
    /// Message fanned out to every connection.
    Broadcast,
    /// Personal message (also used for the echo reply).
    Message,
    /// Ack for a `room_join` request.
    RoomJoin,
    /// Ack for a `room_leave` request.
    RoomLeave,
}

impl EventType {
    /// Wire name of this event kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Pong => "pong",
            Self::Error => "error",
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
            Self::RoomMessage => "room_message",
            Self::Broadcast => "broadcast",
            Self::Message => "message",
            Self::RoomJoin => "room_join",
            Self::RoomLeave => "room_leave",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete wire envelope.
///
/// `data` is an opaque JSON object from the hub's point of view; only the
/// typed payload builders in [`crate::events`] know its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event kind, serialized as the `type` field.
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Event payload.
    pub data: Value,
    /// Server wall-clock time when the envelope was built.
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Wrap an already-built JSON value.
    pub fn new(kind: EventType, data: Value, timestamp: DateTime<Utc>) -> Self {
        Self { kind, data, timestamp }
    }

    /// Wrap a typed event payload.
    pub fn event<T: Serialize>(
        kind: EventType,
        payload: &T,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self { kind, data: serde_json::to_value(payload)?, timestamp })
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_round_trip() {
        let ts = Utc::now();
        let envelope = Envelope::new(EventType::RoomMessage, json!({"text": "hi"}), ts);

        let encoded = envelope.to_json().unwrap();
        let decoded: Envelope = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.kind, EventType::RoomMessage);
        assert_eq!(decoded.data, json!({"text": "hi"}));
        assert_eq!(decoded.timestamp, ts);
    }

    #[test]
    fn type_field_uses_wire_names() {
        let envelope =
            Envelope::new(EventType::UserJoined, json!({"room": "lobby"}), Utc::now());
        let encoded = envelope.to_json().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["type"], "user_joined");
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let envelope = Envelope::new(EventType::Pong, json!({}), Utc::now());
        let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        let raw = value["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(raw).is_ok());
    }

    #[test]
    fn every_event_type_has_a_distinct_wire_name() {
        let kinds = [
            EventType::System,
            EventType::Pong,
            EventType::Error,
            EventType::UserJoined,
            EventType::UserLeft,
            EventType::RoomMessage,
            EventType::Broadcast,
            EventType::Message,
            EventType::RoomJoin,
            EventType::RoomLeave,
        ];

        let names: std::collections::HashSet<_> = kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), kinds.len());
    }
}
