//! The hub facade.
//!
//! [`ConnectionHub`] is the single entry point transports drive: it owns the
//! registry, room index, and heartbeat monitor, and keeps their invariants
//! in lockstep. Every operation is synchronous on `&mut self` (or `&self`
//! for pure delivery); the owning task serializes access.
//!
//! # Invariants
//!
//! - A connection is in a room's member set iff the room is in that
//!   connection's room set.
//! - Disconnect leaves no trace: rooms, user index, and registry entries
//!   are all gone when it returns, and remaining members heard `user_left`
//!   for every room the peer was in.
//! - Caps are checked before any state is mutated; a rejected connect
//!   changes nothing.

use std::collections::HashMap;

use roomcast_core::{Authenticator, Channel, Connection, ConnectionId, ConnectionState, Environment};
use roomcast_proto::{
    Envelope, EventType,
    events::{MembershipEvent, PongEvent, SystemEvent},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    broadcast,
    config::HubConfig,
    error::HubError,
    heartbeat::HeartbeatMonitor,
    registry::Registry,
    rooms::RoomIndex,
};

/// Options for registering a new connection.
#[derive(Debug, Default)]
pub struct ConnectOptions {
    /// Caller-supplied connection id. `None` lets the hub generate one.
    pub connection_id: Option<ConnectionId>,
    /// Authenticated user identity, if the transport resolved one.
    pub user_id: Option<String>,
    /// Arbitrary annotations to attach to the connection.
    pub metadata: HashMap<String, Value>,
}

impl ConnectOptions {
    /// Resolve an optional bearer token against `authenticator` and bind the
    /// resulting identity. A missing or unverifiable token leaves the
    /// connection anonymous; the hub never inspects the token itself.
    pub fn with_token<A: Authenticator>(mut self, authenticator: &A, token: Option<&str>) -> Self {
        self.user_id = token.and_then(|token| authenticator.authenticate(token));
        self
    }
}

/// Point-in-time counts for monitoring, serializable for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Live connections.
    pub connections: usize,
    /// Rooms with at least one member.
    pub rooms: usize,
    /// Distinct users with at least one connection.
    pub users: usize,
    /// Member count per room.
    pub room_sizes: HashMap<String, usize>,
}

/// In-memory connection and room broadcast hub.
///
/// Generic over the channel type `C` and environment `E` so production
/// (tokio channels, system clock) and tests (recording channels, virtual
/// clock) run the same code.
pub struct ConnectionHub<C, E: Environment> {
    env: E,
    config: HubConfig,
    registry: Registry<C, E::Instant>,
    rooms: RoomIndex,
    monitor: HeartbeatMonitor,
}

impl<C: Channel, E: Environment> ConnectionHub<C, E> {
    /// Create a hub.
    pub fn new(env: E, config: HubConfig) -> Self {
        let monitor = HeartbeatMonitor::new(config.heartbeat_timeout);
        Self { env, config, registry: Registry::new(), rooms: RoomIndex::new(), monitor }
    }

    /// The hub's configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a connection and send it the `system` welcome frame.
    ///
    /// # Errors
    ///
    /// - [`HubError::HubFull`] at the global cap
    /// - [`HubError::UserCapacityExceeded`] at the per-user cap
    /// - [`HubError::ConnectionExists`] for a duplicate supplied id
    ///
    /// On error nothing is registered; the transport should close the
    /// underlying socket.
    pub fn connect(&mut self, channel: C, options: ConnectOptions) -> Result<ConnectionId, HubError> {
        if self.registry.len() >= self.config.max_connections {
            return Err(HubError::HubFull { limit: self.config.max_connections });
        }
        if let Some(user_id) = &options.user_id {
            if self.registry.count_for_user(user_id) >= self.config.max_connections_per_user {
                return Err(HubError::UserCapacityExceeded {
                    user_id: user_id.clone(),
                    limit: self.config.max_connections_per_user,
                });
            }
        }

        let id = match options.connection_id {
            Some(id) => {
                if self.registry.contains(&id) {
                    return Err(HubError::ConnectionExists(id));
                }
                id
            },
            None => self.generate_id(),
        };

        let connection = Connection::accepted(
            id.clone(),
            channel,
            options.user_id.clone(),
            options.metadata,
            self.env.wall_clock(),
            self.env.now(),
        );
        self.registry.insert(connection)?;

        let welcome = SystemEvent {
            connection_id: id.to_string(),
            user_id: options.user_id.clone(),
            authenticated: options.user_id.is_some(),
            rooms: Vec::new(),
        };
        self.send_event(&id, EventType::System, &welcome);

        info!(
            connection_id = %id,
            user_id = options.user_id.as_deref().unwrap_or("-"),
            total = self.registry.len(),
            "connection registered"
        );
        Ok(id)
    }

    /// Tear a connection down completely.
    ///
    /// Leaves every room (notifying remaining members), clears the user
    /// index, closes the channel, and removes the registry entry. Returns
    /// `false` if the connection is unknown, making repeated disconnects
    /// harmless.
    pub fn disconnect(&mut self, id: &ConnectionId) -> bool {
        let (user_id, joined) = {
            let Some(connection) = self.registry.get_mut(id) else {
                return false;
            };
            if !connection.begin_disconnect() {
                return false;
            }
            let mut joined: Vec<String> = connection.rooms().iter().cloned().collect();
            joined.sort();
            (connection.user_id().map(str::to_owned), joined)
        };

        // Leave rooms before delivery so the departing peer is already out
        // of every member set when user_left fans out.
        for room in &joined {
            self.rooms.leave(room, id);
        }
        for room in &joined {
            self.notify_membership(EventType::UserLeft, room, id, user_id.clone(), None);
        }

        if let Some(mut connection) = self.registry.remove(id) {
            let _ = connection.transition(ConnectionState::Disconnected);
            connection.close_channel();
        }

        info!(connection_id = %id, rooms = joined.len(), remaining = self.registry.len(), "connection removed");
        true
    }

    /// Add a connection to a room and notify the other members.
    ///
    /// Returns `true` if the connection was newly added. A repeated join
    /// returns `false` but still re-notifies the room, so a client that
    /// lost the first notification converges anyway.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnknownConnection`] for an unregistered id.
    pub fn join_room(&mut self, id: &ConnectionId, room: &str) -> Result<bool, HubError> {
        let user_id = {
            let connection = self
                .registry
                .get_mut(id)
                .ok_or_else(|| HubError::UnknownConnection(id.clone()))?;
            connection.insert_room(room);
            connection.user_id().map(str::to_owned)
        };
        let newly_joined = self.rooms.join(room, id.clone());

        let notified =
            self.notify_membership(EventType::UserJoined, room, id, user_id, Some(id));
        debug!(connection_id = %id, room, newly_joined, notified, "room join");
        Ok(newly_joined)
    }

    /// Remove a connection from a room and notify the remaining members.
    ///
    /// Returns `false` if the connection was not a member; nothing is sent
    /// in that case.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnknownConnection`] for an unregistered id.
    pub fn leave_room(&mut self, id: &ConnectionId, room: &str) -> Result<bool, HubError> {
        let user_id = {
            let connection = self
                .registry
                .get_mut(id)
                .ok_or_else(|| HubError::UnknownConnection(id.clone()))?;
            connection.remove_room(room);
            connection.user_id().map(str::to_owned)
        };
        if !self.rooms.leave(room, id) {
            return Ok(false);
        }

        let notified = self.notify_membership(EventType::UserLeft, room, id, user_id, None);
        debug!(connection_id = %id, room, notified, "room leave");
        Ok(true)
    }

    /// Deliver an envelope to one connection.
    ///
    /// Returns `false` if the connection is unknown, draining, or its
    /// channel rejected the frame.
    pub fn send_personal(&self, id: &ConnectionId, kind: EventType, data: Value) -> bool {
        let Some(frame) = self.encode(Envelope::new(kind, data, self.env.wall_clock())) else {
            return false;
        };
        self.registry.get(id).is_some_and(|connection| broadcast::deliver(connection, &frame))
    }

    /// Deliver an envelope to every connection bound to `user_id`.
    ///
    /// Returns the number of successful deliveries.
    pub fn send_to_user(&self, user_id: &str, kind: EventType, data: Value) -> usize {
        let Some(frame) = self.encode(Envelope::new(kind, data, self.env.wall_clock())) else {
            return 0;
        };
        broadcast::to_user(&self.registry, user_id, &frame)
    }

    /// Fan an envelope out to a room, minus `exclude`.
    ///
    /// Serializes once; returns the number of successful deliveries. A
    /// nonexistent room delivers to nobody.
    pub fn broadcast_to_room(
        &self,
        room: &str,
        kind: EventType,
        data: Value,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let Some(frame) = self.encode(Envelope::new(kind, data, self.env.wall_clock())) else {
            return 0;
        };
        broadcast::to_room(&self.registry, &self.rooms, room, &frame, exclude)
    }

    /// Fan an envelope out to every live connection, minus `exclude`.
    pub fn broadcast_all(&self, kind: EventType, data: Value, exclude: Option<&ConnectionId>) -> usize {
        let Some(frame) = self.encode(Envelope::new(kind, data, self.env.wall_clock())) else {
            return 0;
        };
        broadcast::to_all(&self.registry, &frame, exclude)
    }

    /// Record a liveness proof and reply with `pong`.
    ///
    /// Returns `false` for an unknown connection.
    pub fn handle_ping(&mut self, id: &ConnectionId) -> bool {
        let now = self.env.now();
        let Some(connection) = self.registry.get_mut(id) else {
            return false;
        };
        connection.record_heartbeat(now);

        let pong = PongEvent::at(self.env.wall_clock());
        self.send_event(id, EventType::Pong, &pong);
        true
    }

    /// Disconnect every connection whose heartbeat lapsed.
    ///
    /// Callers schedule this on [`HubConfig::sweep_interval`]. Each stale
    /// connection goes through the full [`disconnect`](Self::disconnect)
    /// path, so rooms are cleaned and members notified. Returns the removed
    /// ids.
    pub fn cleanup_stale(&mut self) -> Vec<ConnectionId> {
        let stale = self.monitor.stale_ids(&self.registry, self.env.now());
        for id in &stale {
            warn!(connection_id = %id, "heartbeat timeout, disconnecting");
            self.disconnect(id);
        }
        stale
    }

    /// Bind a user identity to an already-registered connection.
    ///
    /// # Errors
    ///
    /// - [`HubError::UnknownConnection`] for an unregistered id
    /// - [`HubError::UserCapacityExceeded`] if the identity is at its cap
    pub fn bind_user(&mut self, id: &ConnectionId, user_id: impl Into<String>) -> Result<(), HubError> {
        let user_id = user_id.into();
        let Some(connection) = self.registry.get(id) else {
            return Err(HubError::UnknownConnection(id.clone()));
        };

        let already_bound = connection.user_id() == Some(user_id.as_str());
        if !already_bound
            && self.registry.count_for_user(&user_id) >= self.config.max_connections_per_user
        {
            return Err(HubError::UserCapacityExceeded {
                user_id,
                limit: self.config.max_connections_per_user,
            });
        }

        self.registry.bind_user(id, user_id);
        Ok(())
    }

    /// Set one metadata entry on a connection.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnknownConnection`] for an unregistered id.
    pub fn update_metadata(
        &mut self,
        id: &ConnectionId,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), HubError> {
        let connection = self
            .registry
            .get_mut(id)
            .ok_or_else(|| HubError::UnknownConnection(id.clone()))?;
        connection.set_metadata(key, value);
        Ok(())
    }

    /// Whether the connection's heartbeat is still within the timeout.
    ///
    /// `false` for an unknown connection.
    pub fn check_heartbeat(&self, id: &ConnectionId) -> bool {
        let now = self.env.now();
        self.registry.get(id).is_some_and(|connection| self.monitor.is_alive(connection, now))
    }

    /// Ids of every connection bound to `user_id`, sorted.
    pub fn connections_for_user(&self, user_id: &str) -> Vec<ConnectionId> {
        self.registry.connections_for_user(user_id)
    }

    /// Point-in-time counts.
    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.len(),
            rooms: self.rooms.room_count(),
            users: self.registry.user_count(),
            room_sizes: self.rooms.sizes(),
        }
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.registry.contains(id)
    }

    /// Look up a connection.
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection<C, E::Instant>> {
        self.registry.get(id)
    }

    /// Names of all live rooms, sorted.
    pub fn room_names(&self) -> Vec<String> {
        self.rooms.room_names()
    }

    /// Member ids of a room, sorted. Empty for a nonexistent room.
    pub fn room_members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms.member_ids(room)
    }

    /// Whether `id` is a member of `room`.
    pub fn is_member(&self, room: &str, id: &ConnectionId) -> bool {
        self.rooms.is_member(room, id)
    }

    /// Rooms `id` is in, sorted. Empty for an unknown connection.
    pub fn rooms_of(&self, id: &ConnectionId) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .registry
            .get(id)
            .map(|connection| connection.rooms().iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub(crate) fn env(&self) -> &E {
        &self.env
    }

    /// Encode a typed payload into an envelope and deliver it to `id`.
    pub(crate) fn send_event<T: Serialize>(&self, id: &ConnectionId, kind: EventType, payload: &T) -> bool {
        let timestamp = self.env.wall_clock();
        let envelope = match Envelope::event(kind, payload, timestamp) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(%kind, error = %err, "failed to encode event payload");
                return false;
            },
        };
        let Some(frame) = self.encode(envelope) else {
            return false;
        };
        self.registry.get(id).is_some_and(|connection| broadcast::deliver(connection, &frame))
    }

    fn notify_membership(
        &self,
        kind: EventType,
        room: &str,
        subject: &ConnectionId,
        user_id: Option<String>,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let event = MembershipEvent {
            room: room.to_owned(),
            connection_id: subject.to_string(),
            user_id,
            timestamp: self.env.wall_clock(),
        };
        let envelope = match Envelope::event(kind, &event, event.timestamp) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(%kind, error = %err, "failed to encode membership event");
                return 0;
            },
        };
        let Some(frame) = self.encode(envelope) else {
            return 0;
        };
        broadcast::to_room(&self.registry, &self.rooms, room, &frame, exclude)
    }

    fn encode(&self, envelope: Envelope) -> Option<String> {
        match envelope.to_json() {
            Ok(frame) => Some(frame),
            Err(err) => {
                error!(kind = %envelope.kind, error = %err, "failed to serialize envelope");
                None
            },
        }
    }

    fn generate_id(&self) -> ConnectionId {
        loop {
            let mut bytes = [0u8; 16];
            self.env.random_bytes(&mut bytes);
            let id = ConnectionId::new(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string());
            // Collision is astronomically unlikely; regenerate if it happens.
            if !self.registry.contains(&id) {
                return id;
            }
        }
    }
}
