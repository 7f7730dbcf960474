//! WebSocket transport
//!
//! Everything the core consumes from the transport boundary lives here:
//! the accept loop, the per-connection driver, the outbound socket table,
//! and the server configuration. The core never touches a socket directly;
//! it only sees connection ids and the [`PeerSockets`] sink.

pub mod config;
mod connection;
pub mod listener;
pub mod sink;

pub use config::ServerConfig;
pub use listener::SignalServer;
pub use sink::PeerSockets;
