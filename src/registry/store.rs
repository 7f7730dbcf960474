//! Connection registry implementation
//!
//! The single source of truth for "which connections are live and who owns
//! them". The router and lifecycle manager resolve every target through this
//! registry; nothing reaches into transport internals to find a peer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connection::{generated_display_name, ConnectionEntry, PeerInfo};
use super::error::RegistryError;
use super::key::{ConnectionId, Identity, RoomId};

/// Registry of all live connections
///
/// Thread-safe via `RwLock`. Read-heavy workloads (relay target resolution,
/// member snapshots) benefit from the concurrent read access.
pub struct ConnectionRegistry {
    /// Map of connection id to connection entry
    connections: RwLock<HashMap<ConnectionId, Arc<RwLock<ConnectionEntry>>>>,
}

impl ConnectionRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection under an identity
    ///
    /// Called exactly once per connection, at connect time, before any other
    /// operation touches that connection. A blank identity is refused before
    /// any state is created. A missing display name gets a generated
    /// placeholder.
    pub async fn register(
        &self,
        id: ConnectionId,
        identity: Identity,
        display_name: Option<String>,
    ) -> Result<PeerInfo, RegistryError> {
        if identity.is_blank() {
            return Err(RegistryError::MissingIdentity);
        }

        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(generated_display_name);

        let entry = ConnectionEntry::new(id, identity, display_name);
        let info = entry.info();

        let mut connections = self.connections.write().await;
        connections.insert(id, Arc::new(RwLock::new(entry)));

        tracing::info!(
            connection = %id,
            identity = %info.identity,
            display_name = %info.display_name,
            "Connection registered"
        );

        Ok(info)
    }

    /// Look up a connection's public identification
    ///
    /// `None` means the connection is not (or no longer) registered.
    pub async fn lookup(&self, id: ConnectionId) -> Option<PeerInfo> {
        let connections = self.connections.read().await;
        let entry_arc = connections.get(&id)?.clone();
        drop(connections);

        let entry = entry_arc.read().await;
        Some(entry.info())
    }

    /// Clone the full record for a connection
    ///
    /// Used by disconnect cleanup, which needs `current_room` and the
    /// identity after the transport has already gone away.
    pub async fn snapshot(&self, id: ConnectionId) -> Option<ConnectionEntry> {
        let connections = self.connections.read().await;
        let entry_arc = connections.get(&id)?.clone();
        drop(connections);

        let entry = entry_arc.read().await;
        Some(entry.clone())
    }

    /// The room a connection is currently joined to, if any
    pub async fn current_room(&self, id: ConnectionId) -> Option<RoomId> {
        let connections = self.connections.read().await;
        let entry_arc = connections.get(&id)?.clone();
        drop(connections);

        let entry = entry_arc.read().await;
        entry.current_room.clone()
    }

    /// Remove a connection record
    ///
    /// Idempotent: removing an unknown id is a no-op. Returns the final
    /// record when one existed.
    pub async fn remove(&self, id: ConnectionId) -> Option<ConnectionEntry> {
        let mut connections = self.connections.write().await;
        let entry_arc = connections.remove(&id)?;
        drop(connections);

        let entry = entry_arc.read().await.clone();

        tracing::info!(
            connection = %id,
            identity = %entry.identity,
            "Connection removed from registry"
        );

        Some(entry)
    }

    /// Shared handle to a connection's entry, for in-place mutation
    ///
    /// Only the room directory uses this, to update `current_room` under its
    /// own serialization.
    pub(crate) async fn entry(&self, id: ConnectionId) -> Option<Arc<RwLock<ConnectionEntry>>> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    /// Number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
