//! In-memory connection and room broadcast hub.
//!
//! A single-process hub for real-time messaging backends: it tracks live
//! connections, indexes named rooms, and fans serialized envelopes out to
//! rooms, users, or everyone. The hub owns no sockets; transports hand each
//! connection a [`Channel`](roomcast_core::Channel) and drive the hub with
//! decoded frames.
//!
//! # Architecture
//!
//! - [`ConnectionHub`] is the facade transports talk to: connect,
//!   disconnect, frame dispatch, broadcast, stale-connection sweeps
//! - [`Registry`] owns the connections and the user index
//! - [`RoomIndex`] owns room membership
//! - [`HeartbeatMonitor`] decides which connections are stale
//! - [`MpscChannel`] is the stock channel implementation for tokio
//!   transports; [`SystemEnv`] and [`SimEnv`] are the production and
//!   deterministic-test environments
//!
//! All state is in-memory and lost on restart. Callers serialize access to
//! the hub (one task owning it, or an external lock); the hub itself takes
//! `&mut self` and never blocks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod broadcast;
mod channel;
mod config;
mod dispatch;
mod error;
mod heartbeat;
mod hub;
mod registry;
mod rooms;
mod sim_env;
mod system_env;

pub use roomcast_core::{
    Authenticator, Channel, ChannelError, Connection, ConnectionId, ConnectionState, Environment,
};

pub use channel::{MpscChannel, OutboundMessage};
pub use config::HubConfig;
pub use error::HubError;
pub use heartbeat::HeartbeatMonitor;
pub use hub::{ConnectOptions, ConnectionHub, HubStats};
pub use registry::Registry;
pub use rooms::RoomIndex;
pub use sim_env::{SimEnv, SimInstant};
pub use system_env::SystemEnv;
