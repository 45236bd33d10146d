//! Inbound frame dispatch.
//!
//! The transport reads text off the wire and hands it here per connection.
//! Parsing happens in `roomcast-proto`; this module maps each decoded frame
//! onto the hub operation it requests and sends the reply or error frame.
//! Protocol failures never tear the connection down; the peer gets an
//! `error` envelope and stays connected.

use roomcast_core::{Channel, ConnectionId, Environment};
use roomcast_proto::{
    ClientFrame, ErrorCode, EventType, FrameError,
    events::{EchoEvent, ErrorEvent, RoomAck, RoomMessageEvent},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::hub::ConnectionHub;

impl<C: Channel, E: Environment> ConnectionHub<C, E> {
    /// Handle one inbound text frame from a connection.
    ///
    /// Returns `false` if the connection is unknown (a transport race with
    /// disconnect); the frame is dropped in that case. Every other outcome,
    /// including malformed input, is answered on the connection's channel.
    pub fn handle_frame(&mut self, id: &ConnectionId, text: &str) -> bool {
        if !self.contains(id) {
            warn!(connection_id = %id, "frame from unknown connection dropped");
            return false;
        }

        match ClientFrame::parse(text) {
            Err(err) => self.reject(id, &err),
            Ok(ClientFrame::Ping) => {
                self.handle_ping(id);
            },
            Ok(ClientFrame::RoomJoin { room }) => {
                let success = self.join_room(id, &room).is_ok();
                let ack = RoomAck { room, success, rooms: self.rooms_of(id) };
                self.send_event(id, EventType::RoomJoin, &ack);
            },
            Ok(ClientFrame::RoomLeave { room }) => {
                let success = self.leave_room(id, &room).unwrap_or(false);
                let ack = RoomAck { room, success, rooms: self.rooms_of(id) };
                self.send_event(id, EventType::RoomLeave, &ack);
            },
            Ok(ClientFrame::RoomMessage { room, data }) => self.relay_room_message(id, room, data),
            Ok(ClientFrame::Message { data }) => {
                self.send_event(id, EventType::Message, &EchoEvent::of(data));
            },
        }
        true
    }

    fn relay_room_message(&mut self, id: &ConnectionId, room: String, data: Value) {
        if !self.is_member(&room, id) {
            let event = ErrorEvent::new(
                ErrorCode::NotInRoom,
                format!("join {room} before sending to it"),
            );
            self.send_event(id, EventType::Error, &event);
            return;
        }

        let user_id =
            self.connection(id).and_then(|connection| connection.user_id().map(str::to_owned));
        let event = RoomMessageEvent { room: room.clone(), sender: id.to_string(), user_id, data };

        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(connection_id = %id, room, error = %err, "room message payload failed to encode");
                let event = ErrorEvent::new(ErrorCode::InternalError, "message could not be relayed");
                self.send_event(id, EventType::Error, &event);
                return;
            },
        };

        let delivered = self.broadcast_to_room(&room, EventType::RoomMessage, payload, Some(id));
        debug!(connection_id = %id, room, delivered, "room message relayed");
    }

    fn reject(&self, id: &ConnectionId, err: &FrameError) {
        debug!(connection_id = %id, code = %err.code(), "rejecting frame");
        let event = ErrorEvent::new(err.code(), err.to_string());
        self.send_event(id, EventType::Error, &event);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        channel::{MpscChannel, OutboundMessage},
        config::HubConfig,
        hub::ConnectOptions,
        sim_env::SimEnv,
    };

    fn hub() -> ConnectionHub<MpscChannel, SimEnv> {
        ConnectionHub::new(SimEnv::new(11), HubConfig::default())
    }

    fn connect(
        hub: &mut ConnectionHub<MpscChannel, SimEnv>,
        id: &str,
        user: Option<&str>,
    ) -> (ConnectionId, UnboundedReceiver<OutboundMessage>) {
        let (channel, mut rx) = MpscChannel::pair();
        let options = ConnectOptions {
            connection_id: Some(id.into()),
            user_id: user.map(str::to_owned),
            ..ConnectOptions::default()
        };
        let id = hub.connect(channel, options).unwrap();
        // Swallow the system welcome frame.
        let _ = rx.try_recv().unwrap();
        (id, rx)
    }

    fn frames(rx: &mut UnboundedReceiver<OutboundMessage>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let OutboundMessage::Frame(text) = message {
                out.push(serde_json::from_str(&text).unwrap());
            }
        }
        out
    }

    #[test]
    fn malformed_json_gets_invalid_json_error() {
        let mut hub = hub();
        let (id, mut rx) = connect(&mut hub, "c1", None);

        assert!(hub.handle_frame(&id, "{oops"));

        let replies = frames(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["type"], "error");
        assert_eq!(replies[0]["data"]["code"], "INVALID_JSON");
        // The connection survives a bad frame.
        assert!(hub.contains(&id));
    }

    #[test]
    fn unknown_type_and_missing_room_are_distinct() {
        let mut hub = hub();
        let (id, mut rx) = connect(&mut hub, "c1", None);

        hub.handle_frame(&id, r#"{"type": "subscribe"}"#);
        hub.handle_frame(&id, r#"{"type": "room_join"}"#);

        let replies = frames(&mut rx);
        assert_eq!(replies[0]["data"]["code"], "UNKNOWN_TYPE");
        assert_eq!(replies[1]["data"]["code"], "MISSING_ROOM");
    }

    #[test]
    fn ping_yields_pong_with_timestamp() {
        let mut hub = hub();
        let (id, mut rx) = connect(&mut hub, "c1", None);

        hub.handle_frame(&id, r#"{"type": "ping"}"#);

        let replies = frames(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["type"], "pong");
        assert_eq!(replies[0]["data"]["pong"], true);
        assert!(replies[0]["data"]["timestamp"].is_string());
    }

    #[test]
    fn join_acks_requester_and_notifies_the_room() {
        let mut hub = hub();
        let (first, mut rx_first) = connect(&mut hub, "c1", Some("alice"));
        let (second, mut rx_second) = connect(&mut hub, "c2", Some("bob"));

        hub.handle_frame(&first, r#"{"type": "room_join", "room": "lobby"}"#);
        hub.handle_frame(&second, r#"{"type": "room_join", "room": "lobby"}"#);

        let first_frames = frames(&mut rx_first);
        // Ack for own join, then the notification about the second peer.
        assert_eq!(first_frames[0]["type"], "room_join");
        assert_eq!(first_frames[0]["data"]["success"], true);
        assert_eq!(first_frames[0]["data"]["rooms"], json!(["lobby"]));
        assert_eq!(first_frames[1]["type"], "user_joined");
        assert_eq!(first_frames[1]["data"]["connection_id"], "c2");
        assert_eq!(first_frames[1]["data"]["user_id"], "bob");

        // The joiner does not hear its own user_joined.
        let second_frames = frames(&mut rx_second);
        assert_eq!(second_frames.len(), 1);
        assert_eq!(second_frames[0]["type"], "room_join");
    }

    #[test]
    fn leave_of_unjoined_room_acks_failure() {
        let mut hub = hub();
        let (id, mut rx) = connect(&mut hub, "c1", None);

        hub.handle_frame(&id, r#"{"type": "room_leave", "room": "lobby"}"#);

        let replies = frames(&mut rx);
        assert_eq!(replies[0]["type"], "room_leave");
        assert_eq!(replies[0]["data"]["success"], false);
    }

    #[test]
    fn room_message_reaches_members_but_not_the_sender() {
        let mut hub = hub();
        let (sender, mut rx_sender) = connect(&mut hub, "c1", Some("alice"));
        let (member, mut rx_member) = connect(&mut hub, "c2", None);
        let (outsider, mut rx_outsider) = connect(&mut hub, "c3", None);

        hub.join_room(&sender, "lobby").unwrap();
        hub.join_room(&member, "lobby").unwrap();
        frames(&mut rx_sender);
        frames(&mut rx_member);

        hub.handle_frame(&sender, r#"{"type": "room_message", "room": "lobby", "data": {"text": "hi"}}"#);

        let member_frames = frames(&mut rx_member);
        assert_eq!(member_frames.len(), 1);
        assert_eq!(member_frames[0]["type"], "room_message");
        assert_eq!(member_frames[0]["data"]["room"], "lobby");
        assert_eq!(member_frames[0]["data"]["sender"], "c1");
        assert_eq!(member_frames[0]["data"]["user_id"], "alice");
        assert_eq!(member_frames[0]["data"]["data"], json!({"text": "hi"}));

        assert!(frames(&mut rx_sender).is_empty());
        assert!(frames(&mut rx_outsider).is_empty());
        let _ = outsider;
    }

    #[test]
    fn room_message_without_membership_is_not_in_room() {
        let mut hub = hub();
        let (id, mut rx) = connect(&mut hub, "c1", None);

        hub.handle_frame(&id, r#"{"type": "room_message", "room": "lobby", "data": {}}"#);

        let replies = frames(&mut rx);
        assert_eq!(replies[0]["type"], "error");
        assert_eq!(replies[0]["data"]["code"], "NOT_IN_ROOM");
    }

    #[test]
    fn personal_message_is_echoed() {
        let mut hub = hub();
        let (id, mut rx) = connect(&mut hub, "c1", None);

        hub.handle_frame(&id, r#"{"type": "message", "data": {"note": "to self"}}"#);

        let replies = frames(&mut rx);
        assert_eq!(replies[0]["type"], "message");
        assert_eq!(replies[0]["data"]["echo"], true);
        assert_eq!(replies[0]["data"]["original"], json!({"note": "to self"}));
    }

    #[test]
    fn frames_from_unknown_connections_are_dropped() {
        let mut hub = hub();
        assert!(!hub.handle_frame(&"ghost".into(), r#"{"type": "ping"}"#));
    }
}
