//! Connection records and peer snapshots
//!
//! This module defines the per-connection state stored in the registry.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::key::{ConnectionId, Identity, RoomId};

/// Record for a single live connection in the registry
///
/// `current_room` is the only field mutated after registration, and only by
/// the room directory. It doubles as the reverse index consulted at
/// disconnect, so cleanup never scans the room table.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    /// Connection id assigned by the listener
    pub id: ConnectionId,

    /// Caller-supplied stable user id
    pub identity: Identity,

    /// Display name shown to other peers
    pub display_name: String,

    /// Room this connection is currently joined to, if any
    pub current_room: Option<RoomId>,

    /// When the connection registered
    pub connected_at: Instant,
}

impl ConnectionEntry {
    pub(super) fn new(id: ConnectionId, identity: Identity, display_name: String) -> Self {
        Self {
            id,
            identity,
            display_name,
            current_room: None,
            connected_at: Instant::now(),
        }
    }

    /// Public identification snapshot for outbound events
    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            identity: self.identity.clone(),
            display_name: self.display_name.clone(),
            connection_id: self.id,
        }
    }
}

/// How a peer is identified in outbound events
///
/// Carried in `room-joined` member lists and `user-joined` notifications so
/// receivers can address relays back without a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// Stable user id
    pub identity: Identity,
    /// Display name
    pub display_name: String,
    /// Transient connection id, the relay target address
    pub connection_id: ConnectionId,
}

/// Generate a placeholder display name for clients that do not supply one
pub(crate) fn generated_display_name() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("User-{}", &suffix[..5])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_snapshot() {
        let entry = ConnectionEntry::new(ConnectionId(3), Identity::new("u1"), "Ann".into());
        let info = entry.info();

        assert_eq!(info.connection_id, ConnectionId(3));
        assert_eq!(info.identity, Identity::new("u1"));
        assert_eq!(info.display_name, "Ann");
    }

    #[test]
    fn test_generated_display_name_shape() {
        let name = generated_display_name();

        assert!(name.starts_with("User-"));
        assert_eq!(name.len(), "User-".len() + 5);
    }
}
