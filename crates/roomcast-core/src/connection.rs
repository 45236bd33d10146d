//! Connection entity and lifecycle state machine.
//!
//! A [`Connection`] is the hub's record of one live peer: its identity, its
//! exclusively-owned outbound [`Channel`](crate::Channel), the rooms it is
//! in, and its liveness bookkeeping. State transitions are validated here so
//! higher layers cannot, say, resurrect a disconnected peer.
//!
//! # Invariants
//!
//! - State only moves forward: `Connecting -> Connected -> Disconnecting ->
//!   Disconnected` (with `Connecting -> Disconnected` for handshake aborts).
//! - `last_heartbeat` is monotone under the `Environment` clock; it only
//!   moves when the peer proves liveness.
//! - The room set here mirrors the hub's room index; the index is the
//!   authority for membership queries, this set exists for O(1) "which rooms
//!   am I in" during disconnect and frame handling.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    ops::Sub,
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChannelError, ConnectionError};

/// Unique identifier for one connection.
///
/// Distinct from a user id: one user may hold several connections (multiple
/// tabs, multiple devices), each with its own `ConnectionId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wrap an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Transport accepted, not yet registered with the hub.
    Connecting,
    /// Registered and eligible for delivery.
    Connected,
    /// Teardown in progress; no longer eligible for personal delivery.
    Disconnecting,
    /// Fully removed. Terminal.
    Disconnected,
}

impl ConnectionState {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::{Connected, Connecting, Disconnected, Disconnecting};

        matches!(
            (self, next),
            (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnecting)
                | (Disconnecting, Disconnected)
        )
    }

}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// One live peer: identity, channel, rooms, liveness.
///
/// Generic over the channel type `C` and the environment's instant type `I`
/// so the same entity runs against real sockets and clocks in production and
/// in-memory fakes with a virtual clock in tests.
#[derive(Debug)]
pub struct Connection<C, I> {
    id: ConnectionId,
    channel: C,
    user_id: Option<String>,
    state: ConnectionState,
    rooms: HashSet<String>,
    metadata: HashMap<String, Value>,
    created_at: DateTime<Utc>,
    last_heartbeat: I,
}

impl<C, I> Connection<C, I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a connection in the `Connected` state.
    ///
    /// Registration with the hub is the atomic accept step, so a connection
    /// that exists in the registry is already connected. `now` seeds the
    /// heartbeat clock; a peer is considered live from the moment it
    /// connects, before its first ping.
    pub fn accepted(
        id: ConnectionId,
        channel: C,
        user_id: Option<String>,
        metadata: HashMap<String, Value>,
        created_at: DateTime<Utc>,
        now: I,
    ) -> Self {
        Self {
            id,
            channel,
            user_id,
            state: ConnectionState::Connected,
            rooms: HashSet::new(),
            metadata,
            created_at,
            last_heartbeat: now,
        }
    }

    /// Connection id.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Bound user identity, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Bind or clear the user identity.
    ///
    /// Callers maintaining a user index must update it in the same step;
    /// this only mutates the entity.
    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection is eligible for delivery.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Move to a new lifecycle state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidTransition`] if the state machine
    /// forbids the move.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), ConnectionError> {
        if !self.state.can_transition_to(next) {
            return Err(ConnectionError::InvalidTransition { from: self.state, to: next });
        }
        self.state = next;
        Ok(())
    }

    /// Begin teardown. Returns `false` if teardown already started, which
    /// makes disconnect idempotent for callers.
    pub fn begin_disconnect(&mut self) -> bool {
        self.transition(ConnectionState::Disconnecting).is_ok()
    }

    /// Rooms this connection is currently in.
    pub fn rooms(&self) -> &HashSet<String> {
        &self.rooms
    }

    /// Record room membership. Returns `false` if already a member.
    pub fn insert_room(&mut self, room: impl Into<String>) -> bool {
        self.rooms.insert(room.into())
    }

    /// Drop room membership. Returns `false` if not a member.
    pub fn remove_room(&mut self, room: &str) -> bool {
        self.rooms.remove(room)
    }

    /// Arbitrary key-value annotations attached at connect time.
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Set one metadata entry, returning the previous value if any.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.metadata.insert(key.into(), value)
    }

    /// Wall-clock time the connection was accepted.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Instant of the last liveness proof.
    pub fn last_heartbeat(&self) -> I {
        self.last_heartbeat
    }

    /// Record a liveness proof at `now`.
    pub fn record_heartbeat(&mut self, now: I) {
        self.last_heartbeat = now;
    }

    /// Time since the last liveness proof.
    pub fn heartbeat_elapsed(&self, now: I) -> Duration {
        if now <= self.last_heartbeat {
            return Duration::ZERO;
        }
        now - self.last_heartbeat
    }
}

impl<C, I> Connection<C, I>
where
    C: crate::Channel,
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Deliver one serialized envelope to this peer.
    ///
    /// # Errors
    ///
    /// Propagates the channel's delivery failure; callers log and continue.
    pub fn send(&self, message: String) -> Result<(), ChannelError> {
        self.channel.send(message)
    }

    /// Close the underlying channel.
    pub fn close_channel(&self) {
        self.channel.close();
    }
}
