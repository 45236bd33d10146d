//! Authentication collaborator.
//!
//! Token verification happens before a peer reaches the hub; the hub only
//! sees the outcome as an optional user id. This trait is the seam: the
//! transport layer calls it during connection setup, and tests plug in a
//! closure.

/// Resolves an opaque bearer token to a user identity.
///
/// Returning `None` means the token did not verify. Connections without a
/// token skip this entirely and stay anonymous.
pub trait Authenticator: Send + Sync + 'static {
    /// Verify `token` and return the user id it belongs to.
    fn authenticate(&self, token: &str) -> Option<String>;
}

impl<F> Authenticator for F
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    fn authenticate(&self, token: &str) -> Option<String> {
        self(token)
    }
}
