//! Connection registry and user index.
//!
//! Owns every live [`Connection`] plus the user-to-connections index that
//! makes "send to all of this user's devices" an O(1) lookup.
//!
//! # Invariants
//!
//! - `by_user` contains exactly the connections whose `user_id` is set;
//!   anonymous connections appear only in `connections`.
//! - No user key maps to an empty set; the last connection removed for a
//!   user removes the key.
//! - A connection id appears in at most one user's set.

use std::collections::{HashMap, HashSet};

use roomcast_core::{Connection, ConnectionId};

use crate::error::HubError;

/// Registry of live connections, indexed by id and by user.
#[derive(Debug)]
pub struct Registry<C, I> {
    connections: HashMap<ConnectionId, Connection<C, I>>,
    by_user: HashMap<String, HashSet<ConnectionId>>,
}

impl<C, I> Default for Registry<C, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, I> Registry<C, I> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { connections: HashMap::new(), by_user: HashMap::new() }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of distinct users with at least one connection.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Option<&Connection<C, I>> {
        self.connections.get(id)
    }

    /// Look up a connection mutably.
    pub fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection<C, I>> {
        self.connections.get_mut(id)
    }

    /// Iterate over all connections, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection<C, I>> {
        self.connections.values()
    }

    /// Number of connections currently bound to `user_id`.
    pub fn count_for_user(&self, user_id: &str) -> usize {
        self.by_user.get(user_id).map_or(0, HashSet::len)
    }

    /// Ids of every connection bound to `user_id`, sorted for determinism.
    pub fn connections_for_user(&self, user_id: &str) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> =
            self.by_user.get(user_id).map(|set| set.iter().cloned().collect()).unwrap_or_default();
        ids.sort();
        ids
    }
}

impl<C, I> Registry<C, I>
where
    I: Copy + Ord + std::ops::Sub<Output = std::time::Duration>,
{
    /// Register a connection.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ConnectionExists`] if the id is already taken;
    /// the existing connection is left untouched.
    pub fn insert(&mut self, connection: Connection<C, I>) -> Result<(), HubError> {
        let id = connection.id().clone();
        if self.connections.contains_key(&id) {
            return Err(HubError::ConnectionExists(id));
        }

        if let Some(user_id) = connection.user_id() {
            self.by_user.entry(user_id.to_owned()).or_default().insert(id.clone());
        }
        self.connections.insert(id, connection);
        Ok(())
    }

    /// Remove a connection, returning it for final teardown.
    ///
    /// Clears the user index entry; the caller is responsible for room
    /// cleanup before calling this.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Connection<C, I>> {
        let connection = self.connections.remove(id)?;

        if let Some(user_id) = connection.user_id() {
            if let Some(set) = self.by_user.get_mut(user_id) {
                set.remove(id);
                if set.is_empty() {
                    self.by_user.remove(user_id);
                }
            }
        }
        Some(connection)
    }

    /// Bind (or rebind) a user identity to a connection, keeping the user
    /// index consistent. Returns `false` if the connection is unknown.
    pub fn bind_user(&mut self, id: &ConnectionId, user_id: String) -> bool {
        let Some(connection) = self.connections.get_mut(id) else {
            return false;
        };

        if let Some(previous) = connection.user_id() {
            if previous == user_id {
                return true;
            }
            let previous = previous.to_owned();
            if let Some(set) = self.by_user.get_mut(&previous) {
                set.remove(id);
                if set.is_empty() {
                    self.by_user.remove(&previous);
                }
            }
        }

        self.by_user.entry(user_id.clone()).or_default().insert(id.clone());
        connection.set_user_id(Some(user_id));
        true
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use chrono::Utc;
    use roomcast_core::{Channel, ChannelError};

    use super::*;
    use crate::sim_env::SimInstant;

    struct NullChannel;

    impl Channel for NullChannel {
        fn send(&self, _message: String) -> Result<(), ChannelError> {
            Ok(())
        }

        fn close(&self) {}
    }

    fn conn(id: &str, user: Option<&str>) -> Connection<NullChannel, SimInstant> {
        Connection::accepted(
            ConnectionId::new(id),
            NullChannel,
            user.map(str::to_owned),
            HashMap::new(),
            Utc::now(),
            SimInstant::from_offset(Duration::ZERO),
        )
    }

    #[test]
    fn insert_and_lookup() {
        let mut registry = Registry::new();

        registry.insert(conn("c1", Some("alice"))).unwrap();
        registry.insert(conn("c2", None)).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&"c1".into()));
        assert_eq!(registry.get(&"c1".into()).unwrap().user_id(), Some("alice"));
        assert_eq!(registry.get(&"c2".into()).unwrap().user_id(), None);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut registry = Registry::new();

        registry.insert(conn("c1", None)).unwrap();
        let err = registry.insert(conn("c1", Some("alice"))).unwrap_err();

        assert_eq!(err, HubError::ConnectionExists("c1".into()));
        assert_eq!(registry.len(), 1);
        // Losing insert did not touch the user index.
        assert_eq!(registry.count_for_user("alice"), 0);
    }

    #[test]
    fn user_index_tracks_bound_connections_only() {
        let mut registry = Registry::new();

        registry.insert(conn("c1", Some("alice"))).unwrap();
        registry.insert(conn("c2", Some("alice"))).unwrap();
        registry.insert(conn("c3", None)).unwrap();

        assert_eq!(registry.count_for_user("alice"), 2);
        assert_eq!(registry.connections_for_user("alice"), vec!["c1".into(), "c2".into()]);
        assert_eq!(registry.user_count(), 1);
    }

    #[test]
    fn remove_clears_user_index() {
        let mut registry = Registry::new();

        registry.insert(conn("c1", Some("alice"))).unwrap();
        registry.insert(conn("c2", Some("alice"))).unwrap();

        assert!(registry.remove(&"c1".into()).is_some());
        assert_eq!(registry.count_for_user("alice"), 1);

        assert!(registry.remove(&"c2".into()).is_some());
        assert_eq!(registry.count_for_user("alice"), 0);
        assert_eq!(registry.user_count(), 0);
    }

    #[test]
    fn remove_unknown_is_none() {
        let mut registry: Registry<NullChannel, SimInstant> = Registry::new();
        assert!(registry.remove(&"ghost".into()).is_none());
    }

    #[test]
    fn bind_user_moves_index_entry() {
        let mut registry = Registry::new();

        registry.insert(conn("c1", None)).unwrap();
        assert!(registry.bind_user(&"c1".into(), "alice".to_owned()));
        assert_eq!(registry.count_for_user("alice"), 1);

        // Rebinding to another identity moves the entry, leaving no residue.
        assert!(registry.bind_user(&"c1".into(), "bob".to_owned()));
        assert_eq!(registry.count_for_user("alice"), 0);
        assert_eq!(registry.count_for_user("bob"), 1);
        assert_eq!(registry.get(&"c1".into()).unwrap().user_id(), Some("bob"));
    }

    #[test]
    fn bind_user_unknown_connection_is_false() {
        let mut registry: Registry<NullChannel, SimInstant> = Registry::new();
        assert!(!registry.bind_user(&"ghost".into(), "alice".to_owned()));
    }
}
