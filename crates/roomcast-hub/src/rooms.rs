//! Room membership index.
//!
//! Rooms are lightweight labels: they exist while at least one connection is
//! a member and vanish with the last leave. This index is the authority for
//! "who is in room X"; each connection's own room set answers the reverse
//! question and the hub keeps the two in lockstep.
//!
//! # Invariants
//!
//! - No room key maps to an empty member set.
//! - Membership is symmetric with the connections' room sets (enforced by
//!   the hub, which mutates both in the same operation).

use std::collections::{HashMap, HashSet};

use roomcast_core::ConnectionId;

/// Bidirectional room membership index (room side).
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl RoomIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` to `room`, creating the room if needed.
    ///
    /// Returns `false` if `id` was already a member.
    pub fn join(&mut self, room: &str, id: ConnectionId) -> bool {
        self.rooms.entry(room.to_owned()).or_default().insert(id)
    }

    /// Remove `id` from `room`, deleting the room if it empties.
    ///
    /// Returns `false` if `id` was not a member (including a room that does
    /// not exist).
    pub fn leave(&mut self, room: &str, id: &ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(id);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }

    /// Whether `id` is a member of `room`.
    pub fn is_member(&self, room: &str, id: &ConnectionId) -> bool {
        self.rooms.get(room).is_some_and(|members| members.contains(id))
    }

    /// Members of `room`, if it exists.
    pub fn members(&self, room: &str) -> Option<&HashSet<ConnectionId>> {
        self.rooms.get(room)
    }

    /// Member ids of `room`, sorted. Empty for a nonexistent room.
    pub fn member_ids(&self, room: &str) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> =
            self.rooms.get(room).map(|set| set.iter().cloned().collect()).unwrap_or_default();
        ids.sort();
        ids
    }

    /// Number of members in `room`. Zero for a nonexistent room.
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    /// Names of all live rooms, sorted.
    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Member count per room, for monitoring snapshots.
    pub fn sizes(&self) -> HashMap<String, usize> {
        self.rooms.iter().map(|(room, members)| (room.clone(), members.len())).collect()
    }
}
