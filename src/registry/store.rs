use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::connection::{Connection, ConnectionId};

/// Outcome of visiting one connection during [`ConnectionRegistry::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    Evict,
}

/// The set of live connections.
///
/// Register, remove and enumerate all take the same lock, so an enumeration
/// never observes a half-updated membership set.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        // Nothing in the critical sections can leave the map half-written,
        // so a poisoned lock is still safe to use.
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a connection and returns the member count after the insert.
    /// Registering an id that is already present replaces the old handle.
    pub fn register(&self, connection: Connection) -> usize {
        let mut connections = self.lock();
        connections.insert(connection.id, connection);
        connections.len()
    }

    /// Removes a connection, returning it together with the number of
    /// connections left, or `None` if it was not registered.
    pub fn remove(&self, id: &ConnectionId) -> Option<(Connection, usize)> {
        let mut connections = self.lock();
        let removed = connections.remove(id)?;
        Some((removed, connections.len()))
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Calls `visit` for every registered connection while holding the lock.
    ///
    /// Connections for which `visit` returns [`Visit::Evict`] are removed in
    /// the same critical section and handed back, so the caller can close them
    /// after the lock is released. Iteration order is unspecified.
    pub fn for_each<F>(&self, mut visit: F) -> Vec<Connection>
    where
        F: FnMut(&Connection) -> Visit,
    {
        let mut connections = self.lock();
        let mut evicted = Vec::new();
        connections.retain(|_, connection| match visit(&*connection) {
            Visit::Keep => true,
            Visit::Evict => {
                evicted.push(connection.clone());
                false
            }
        });
        evicted
    }
}
