//! Fan-out delivery over the registry and room index.
//!
//! Every function here takes an already-serialized frame and clones the
//! string per target, so a broadcast serializes exactly once no matter how
//! many members a room has. Delivery failures are isolated: a dead channel
//! costs its own peer the frame and nothing else, and shows up only as a
//! reduced delivery count plus a warning in the log.

use std::{ops::Sub, time::Duration};

use roomcast_core::{Channel, Connection, ConnectionId};
use tracing::warn;

use crate::{registry::Registry, rooms::RoomIndex};

/// Deliver one frame to one connection, if it is eligible.
///
/// Connections that are draining (`Disconnecting`) or already gone are
/// skipped silently; channel failures are logged and reported as a miss.
pub(crate) fn deliver<C, I>(connection: &Connection<C, I>, frame: &str) -> bool
where
    C: Channel,
    I: Copy + Ord + Sub<Output = Duration>,
{
    if !connection.is_connected() {
        return false;
    }
    match connection.send(frame.to_owned()) {
        Ok(()) => true,
        Err(error) => {
            warn!(connection_id = %connection.id(), %error, "frame delivery failed");
            false
        },
    }
}

/// Fan a frame out to every member of `room`, minus `exclude`.
///
/// Returns the number of successful deliveries. A nonexistent room delivers
/// to nobody.
pub(crate) fn to_room<C, I>(
    registry: &Registry<C, I>,
    rooms: &RoomIndex,
    room: &str,
    frame: &str,
    exclude: Option<&ConnectionId>,
) -> usize
where
    C: Channel,
    I: Copy + Ord + Sub<Output = Duration>,
{
    let Some(members) = rooms.members(room) else {
        return 0;
    };
    members
        .iter()
        .filter(|id| exclude != Some(id))
        .filter_map(|id| registry.get(id))
        .filter(|connection| deliver(connection, frame))
        .count()
}

/// Fan a frame out to every live connection, minus `exclude`.
pub(crate) fn to_all<C, I>(
    registry: &Registry<C, I>,
    frame: &str,
    exclude: Option<&ConnectionId>,
) -> usize
where
    C: Channel,
    I: Copy + Ord + Sub<Output = Duration>,
{
    registry
        .iter()
        .filter(|connection| exclude != Some(connection.id()))
        .filter(|connection| deliver(connection, frame))
        .count()
}

/// Deliver a frame to every connection bound to `user_id`.
pub(crate) fn to_user<C, I>(registry: &Registry<C, I>, user_id: &str, frame: &str) -> usize
where
    C: Channel,
    I: Copy + Ord + Sub<Output = Duration>,
{
    registry
        .connections_for_user(user_id)
        .iter()
        .filter_map(|id| registry.get(id))
        .filter(|connection| deliver(connection, frame))
        .count()
}
