//! Core error types.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Failure delivering a frame through a [`Channel`](crate::Channel).
///
/// These are per-peer delivery failures. Broadcast code treats them as "this
/// one target missed the frame" and moves on; they never abort an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The peer's outbound queue or transport is gone.
    #[error("channel closed")]
    Closed,

    /// The transport refused the frame for some other reason.
    #[error("send refused: {0}")]
    Refused(String),
}

/// Violation of the connection lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Attempted a transition the state machine does not allow.
    #[error("invalid connection state transition: {from} -> {to}")]
    InvalidTransition {
        /// State the connection was in.
        from: ConnectionState,
        /// State the caller asked for.
        to: ConnectionState,
    },
}
