//! Connection, room, and identity directories
//!
//! The registry is the single source of truth for signaling state: which
//! connections are live, which room each one is in, and which connections
//! answer for a given identity.
//!
//! # Architecture
//!
//! ```text
//!            Arc<ConnectionRegistry>
//!      ┌────────────────────────────────┐
//!      │ connections: HashMap<          │
//!      │   ConnectionId,                │
//!      │   ConnectionEntry {            │
//!      │     identity, display_name,    │
//!      │     current_room,              │◄── reverse index used at
//!      │   }                            │    disconnect (no room scan)
//!      │ >                              │
//!      └───────────────┬────────────────┘
//!                      │ consulted by
//!        ┌─────────────┴──────────────┐
//!        ▼                            ▼
//!   RoomDirectory               IdentityDirectory
//!   RoomId -> {ConnectionId}    Identity -> {ConnectionId}
//!   (multi-party rooms)         (direct calls)
//! ```
//!
//! Invariants: a connection is a member of at most one room; a room with no
//! members does not exist; every member id in the room table resolves in the
//! registry while its connection is live.

pub mod connection;
pub mod error;
pub mod identity;
pub mod key;
pub mod rooms;
pub mod store;

pub use connection::{ConnectionEntry, PeerInfo};
pub use error::RegistryError;
pub use identity::IdentityDirectory;
pub use key::{ConnectionId, Identity, RoomId};
pub use rooms::{JoinOutcome, LeaveOutcome, RoomDirectory};
pub use store::ConnectionRegistry;
