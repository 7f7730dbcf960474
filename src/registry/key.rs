//! Identifier types for connections, rooms, and identities
//!
//! These are the keys the directories are indexed by. All of them are
//! newtypes so that a room name can never be passed where an identity is
//! expected.

use serde::{Deserialize, Serialize};

/// Unique identifier for a live connection
///
/// Allocated by the server listener at accept time and never reused within
/// a process run. Clients learn their own id from the `registered` ack and
/// other peers' ids from `room-joined` / `user-joined` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Room identifier (arbitrary client-supplied string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Create a new room id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-asserted stable user id, distinct from the transient connection id
///
/// Several live connections may share one identity (same user on two
/// devices); the identity directory keeps all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Create a new identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Whether the identity is empty after trimming
    ///
    /// Empty identities are rejected at registration time.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_identity() {
        assert!(Identity::new("").is_blank());
        assert!(Identity::new("   ").is_blank());
        assert!(!Identity::new("u1").is_blank());
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(7).to_string(), "#7");
    }
}
