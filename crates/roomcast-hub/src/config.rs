//! Hub configuration.

use std::time::Duration;

/// Tunables for a [`ConnectionHub`](crate::ConnectionHub).
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hard cap on simultaneous connections across the whole hub.
    pub max_connections: usize,
    /// Cap on simultaneous connections per bound user identity. Anonymous
    /// connections are not counted against any user.
    pub max_connections_per_user: usize,
    /// A connection with no liveness proof for this long is stale and gets
    /// removed by the next sweep.
    pub heartbeat_timeout: Duration,
    /// Suggested interval between stale-connection sweeps. The hub does not
    /// schedule sweeps itself; the owning task calls
    /// [`cleanup_stale`](crate::ConnectionHub::cleanup_stale) on this cadence.
    pub sweep_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            max_connections_per_user: 5,
            heartbeat_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(20),
        }
    }
}
