//! Transport-agnostic core for the roomcast hub.
//!
//! This crate holds the leaf types the hub is built from, with no I/O and no
//! runtime dependency:
//!
//! - [`Channel`]: the minimal send/close capability a connection exclusively
//!   owns, decoupling the hub from any concrete socket type
//! - [`Connection`]: one live peer and its lifecycle state machine
//! - [`Environment`]: time and randomness abstraction enabling deterministic
//!   tests (virtual clock, seeded RNG) alongside production system resources
//! - [`Authenticator`]: the collaborator interface that resolves opaque
//!   bearer tokens to user identities before a peer reaches the hub
//!
//! Protocol logic here is pure: methods take time as input and never block,
//! in the Sans-IO style. The hub crate composes these into the registry,
//! room index, and broadcast machinery.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod channel;
mod connection;
mod env;
mod error;

pub use auth::Authenticator;
pub use channel::Channel;
pub use connection::{Connection, ConnectionId, ConnectionState};
pub use env::Environment;
pub use error::{ChannelError, ConnectionError};
