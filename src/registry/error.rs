//! Registry error types
//!
//! Error types for connection registry operations.

use super::key::ConnectionId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration attempted without a usable identity
    MissingIdentity,
    /// Operation referenced a connection that is not registered
    ///
    /// Normal during the window where an event races disconnect cleanup;
    /// callers treat it as a dropped event, not a fault.
    ConnectionNotFound(ConnectionId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::MissingIdentity => write!(f, "identity is required"),
            RegistryError::ConnectionNotFound(id) => {
                write!(f, "connection not found: {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
