//! Hub error types.

use roomcast_core::ConnectionId;
use thiserror::Error;

/// Failure of a hub operation.
///
/// Delivery failures are not errors; broadcast operations report them as
/// reduced delivery counts. These variants cover operations that could not
/// take effect at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The global connection cap is reached.
    #[error("connection limit reached ({limit})")]
    HubFull {
        /// Configured global cap.
        limit: usize,
    },

    /// The per-user connection cap is reached for this user.
    #[error("user {user_id} is at its connection limit ({limit})")]
    UserCapacityExceeded {
        /// User whose cap was hit.
        user_id: String,
        /// Configured per-user cap.
        limit: usize,
    },

    /// A caller-supplied connection id is already registered.
    #[error("connection {0} already exists")]
    ConnectionExists(ConnectionId),

    /// The operation targeted a connection the hub does not know.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}
