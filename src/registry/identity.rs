//! Direct-address directory
//!
//! Maps a stable identity to the connections currently registered under it,
//! so calls can be addressed by who a user is rather than which room they
//! are in. Normally an identity has zero or one connection, but the same
//! user connecting from two devices is tolerated: the binding keeps all of
//! them and identity-addressed relays fan out to every one.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::key::{ConnectionId, Identity};

/// Identity-keyed lookup for direct calls
pub struct IdentityDirectory {
    /// Map of identity to its live connections
    bindings: RwLock<HashMap<Identity, HashSet<ConnectionId>>>,
}

impl IdentityDirectory {
    /// Create a new, empty directory
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Bind a connection under an identity, at connect time
    pub async fn bind(&self, identity: &Identity, id: ConnectionId) {
        let mut bindings = self.bindings.write().await;
        let connections = bindings.entry(identity.clone()).or_default();
        connections.insert(id);

        tracing::debug!(
            identity = %identity,
            connection = %id,
            bound = connections.len(),
            "Identity bound"
        );
    }

    /// Unbind a connection, at disconnect time
    ///
    /// Deletes the identity entry when its last connection goes away.
    /// No-op for an unknown identity or connection.
    pub async fn unbind(&self, identity: &Identity, id: ConnectionId) {
        let mut bindings = self.bindings.write().await;

        if let Some(connections) = bindings.get_mut(identity) {
            connections.remove(&id);
            if connections.is_empty() {
                bindings.remove(identity);
                tracing::debug!(identity = %identity, "Identity unbound (no connections left)");
            }
        }
    }

    /// All live connections registered under an identity
    ///
    /// May be empty; callers treat an unresolvable identity as a dropped
    /// relay, not an error.
    pub async fn resolve(&self, identity: &Identity) -> Vec<ConnectionId> {
        let bindings = self.bindings.read().await;
        bindings
            .get(identity)
            .map(|connections| connections.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of bound identities
    pub async fn identity_count(&self) -> usize {
        self.bindings.read().await.len()
    }
}

impl Default for IdentityDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_resolve() {
        let directory = IdentityDirectory::new();
        let identity = Identity::new("u1");

        directory.bind(&identity, ConnectionId(1)).await;

        assert_eq!(directory.resolve(&identity).await, vec![ConnectionId(1)]);
        assert!(directory.resolve(&Identity::new("u2")).await.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_connections_share_identity() {
        let directory = IdentityDirectory::new();
        let identity = Identity::new("u1");

        directory.bind(&identity, ConnectionId(1)).await;
        directory.bind(&identity, ConnectionId(2)).await;

        let mut resolved = directory.resolve(&identity).await;
        resolved.sort_by_key(|id| id.0);
        assert_eq!(resolved, vec![ConnectionId(1), ConnectionId(2)]);
        assert_eq!(directory.identity_count().await, 1);

        // Dropping one connection keeps the identity reachable
        directory.unbind(&identity, ConnectionId(1)).await;
        assert_eq!(directory.resolve(&identity).await, vec![ConnectionId(2)]);
    }

    #[tokio::test]
    async fn test_unbind_last_connection_removes_entry() {
        let directory = IdentityDirectory::new();
        let identity = Identity::new("u1");

        directory.bind(&identity, ConnectionId(1)).await;
        directory.unbind(&identity, ConnectionId(1)).await;

        assert!(directory.resolve(&identity).await.is_empty());
        assert_eq!(directory.identity_count().await, 0);
    }

    #[tokio::test]
    async fn test_unbind_unknown_is_noop() {
        let directory = IdentityDirectory::new();

        directory.unbind(&Identity::new("ghost"), ConnectionId(1)).await;

        assert_eq!(directory.identity_count().await, 0);
    }
}
