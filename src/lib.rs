//! WebRTC signaling relay
//!
//! A relay server for peer-to-peer media negotiation. It never carries
//! audio, video, or data; it brokers the handshake messages (session
//! descriptions and ICE candidates) that let endpoints establish a direct
//! peer connection, and it tracks which connections belong to which room
//! or answer for which identity.
//!
//! # Architecture
//!
//! ```text
//!   WebSocket clients
//!         │ JSON events
//!         ▼
//!   server::SignalServer ── accept loop, one driver task per socket
//!         │
//!         ▼
//!   session::LifecycleManager ── connect / join / leave / disconnect
//!         │                      membership broadcasts
//!         ├──► registry::ConnectionRegistry   who is connected
//!         ├──► registry::RoomDirectory        who is in which room
//!         ├──► registry::IdentityDirectory    who answers for an identity
//!         │
//!         ▼
//!   router::Router ── point-to-point relay of opaque payloads
//!         │
//!         ▼
//!   router::EventSink (server::PeerSockets) ── per-peer outbound queues
//! ```
//!
//! # Example
//!
//! ```no_run
//! use signal_rs::{ServerConfig, SignalServer};
//!
//! #[tokio::main]
//! async fn main() -> signal_rs::Result<()> {
//!     let config = ServerConfig::default().max_connections(1024);
//!     let server = SignalServer::new(config);
//!     server.run().await
//! }
//! ```
//!
//! Clients speak one JSON object per text frame. The first frame must be
//! `{"type": "register", "identity": "..."}`; everything after that is
//! rooms (`join-room`, `leave-room`), relays (`offer`, `answer`,
//! `ice-candidate`), or direct calls (`direct-call`, `direct-answer`).

pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{ClientEvent, ServerEvent};
pub use registry::{
    ConnectionId, ConnectionRegistry, Identity, IdentityDirectory, PeerInfo, RoomDirectory, RoomId,
};
pub use router::{EventSink, Router};
pub use server::{PeerSockets, ServerConfig, SignalServer};
pub use session::{LifecycleManager, SessionPhase, SessionState};
pub use stats::{ServerStats, StatsSnapshot};
