//! Stale-connection detection.
//!
//! Liveness is proven by `ping` frames; the monitor only reads the
//! per-connection heartbeat clock and decides who is stale. It never removes
//! anything itself: the hub turns stale ids into full disconnects so room
//! cleanup and `user_left` notifications run exactly as they would for a
//! deliberate disconnect.

use std::{ops::Sub, time::Duration};

use roomcast_core::{Connection, ConnectionId};

use crate::registry::Registry;

/// Decides which connections have gone quiet for too long.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatMonitor {
    timeout: Duration,
}

impl HeartbeatMonitor {
    /// Create a monitor with the given staleness threshold.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured staleness threshold.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a connection still counts as live at `now`.
    ///
    /// A connection exactly at the threshold is stale; `is_alive` holds
    /// strictly below it.
    pub fn is_alive<C, I>(&self, connection: &Connection<C, I>, now: I) -> bool
    where
        I: Copy + Ord + Sub<Output = Duration>,
    {
        connection.heartbeat_elapsed(now) < self.timeout
    }

    /// Ids of every stale connection at `now`, sorted for determinism.
    pub fn stale_ids<C, I>(&self, registry: &Registry<C, I>, now: I) -> Vec<ConnectionId>
    where
        I: Copy + Ord + Sub<Output = Duration>,
    {
        let mut stale: Vec<ConnectionId> = registry
            .iter()
            .filter(|connection| !self.is_alive(connection, now))
            .map(|connection| connection.id().clone())
            .collect();
        stale.sort();
        stale
    }
}
