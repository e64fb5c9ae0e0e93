//! Ownership table for live synchronization sessions.
//!
//! The sync route inserts one [`RegisteredConnection`] per accepted socket
//! and removes it once the socket closes. The entry owns the engine's
//! [`SyncHandle`], so the engine lives exactly as long as the connection.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::ConnectionId;
use crate::engine::SyncHandle;
use crate::error::SyncError;

/// One live connection and the handle keeping its engine alive.
pub struct RegisteredConnection {
    /// Connection identifier.
    pub connection_id: ConnectionId,
    /// Route path the connection was accepted on.
    pub path: String,
    /// Time the connection was registered.
    pub connected_at: DateTime<Utc>,
    _handle: SyncHandle,
}

impl RegisteredConnection {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(connection_id: ConnectionId, path: String, handle: SyncHandle) -> Self {
        Self {
            connection_id,
            path,
            connected_at: Utc::now(),
            _handle: handle,
        }
    }
}

impl fmt::Debug for RegisteredConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredConnection")
            .field("connection_id", &self.connection_id)
            .field("path", &self.path)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

/// Handle-free view of a registry entry.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    /// Connection identifier.
    pub connection_id: ConnectionId,
    /// Route path the connection was accepted on.
    pub path: String,
    /// Time the connection was registered.
    pub connected_at: DateTime<Utc>,
}

impl From<&RegisteredConnection> for ConnectionSummary {
    fn from(entry: &RegisteredConnection) -> Self {
        Self {
            connection_id: entry.connection_id,
            path: entry.path.clone(),
            connected_at: entry.connected_at,
        }
    }
}

/// Registry of live connections keyed by [`ConnectionId`].
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, RegisteredConnection>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Internal`] if the ID is already registered
    /// (should never happen with UUID v4).
    pub async fn insert(&self, entry: RegisteredConnection) -> Result<ConnectionId, SyncError> {
        let connection_id = entry.connection_id;
        let mut map = self.connections.write().await;
        if map.contains_key(&connection_id) {
            return Err(SyncError::Internal(format!(
                "connection {connection_id} already registered"
            )));
        }
        map.insert(connection_id, entry);
        Ok(connection_id)
    }

    /// Removes a connection and returns its entry.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConnectionNotFound`] if no such connection is
    /// registered.
    pub async fn remove(
        &self,
        connection_id: ConnectionId,
    ) -> Result<RegisteredConnection, SyncError> {
        self.connections
            .write()
            .await
            .remove(&connection_id)
            .ok_or(SyncError::ConnectionNotFound(connection_id))
    }

    /// Returns summaries of all live connections, oldest first.
    pub async fn list(&self) -> Vec<ConnectionSummary> {
        let map = self.connections.read().await;
        let mut summaries: Vec<ConnectionSummary> =
            map.values().map(ConnectionSummary::from).collect();
        summaries.sort_by_key(|summary| summary.connected_at);
        summaries
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Debug)]
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn entry(handle: SyncHandle) -> RegisteredConnection {
        RegisteredConnection::new(ConnectionId::new(), "/sync".to_string(), handle)
    }

    #[tokio::test]
    async fn insert_and_remove() {
        let registry = ConnectionRegistry::new();
        let Ok(id) = registry.insert(entry(Box::new(()))).await else {
            panic!("insert failed");
        };
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.list().await.first().map(|summary| summary.connection_id), Some(id));

        let removed = registry.remove(id).await;
        assert!(removed.is_ok());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let first = RegisteredConnection::new(id, "/a".to_string(), Box::new(()));
        let second = RegisteredConnection::new(id, "/b".to_string(), Box::new(()));
        assert!(registry.insert(first).await.is_ok());
        assert!(registry.insert(second).await.is_err());
    }

    #[tokio::test]
    async fn remove_unknown_returns_not_found() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let Err(SyncError::ConnectionNotFound(missing)) = registry.remove(id).await else {
            panic!("expected ConnectionNotFound");
        };
        assert_eq!(missing, id);
    }

    #[tokio::test]
    async fn removing_entry_releases_handle() {
        let dropped = Arc::new(AtomicBool::new(false));
        let registry = ConnectionRegistry::new();
        let Ok(id) = registry
            .insert(entry(Box::new(DropFlag(Arc::clone(&dropped)))))
            .await
        else {
            panic!("insert failed");
        };
        assert!(!dropped.load(Ordering::SeqCst));

        let _ = registry.remove(id).await;
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn list_returns_summaries() {
        let registry = ConnectionRegistry::new();
        let _ = registry.insert(entry(Box::new(()))).await;
        let _ = registry.insert(entry(Box::new(()))).await;

        let list = registry.list().await;
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|summary| summary.path == "/sync"));
    }
}
