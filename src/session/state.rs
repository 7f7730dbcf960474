//! Session state machine
//!
//! Tracks one connection from accept to disconnect. There is no reconnect
//! within a session: a client that comes back gets a fresh connection id
//! and a fresh session.

use std::net::SocketAddr;
use std::time::Instant;

use crate::registry::ConnectionId;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Socket accepted, registration frame not yet received
    Connecting,
    /// Registered and relayable
    Active,
    /// Terminal; cleanup has run or is running
    Disconnected,
}

/// Per-connection session state, owned by the connection driver
#[derive(Debug)]
pub struct SessionState {
    /// Connection id assigned at accept time
    pub id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// When the socket was accepted
    pub opened_at: Instant,

    /// When registration completed
    pub registered_at: Option<Instant>,

    /// Inbound events handled on this session
    pub events_received: u64,
}

impl SessionState {
    /// Create a new session in the `Connecting` phase
    pub fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connecting,
            opened_at: Instant::now(),
            registered_at: None,
            events_received: 0,
        }
    }

    /// Registration accepted; the session becomes relayable
    pub fn activate(&mut self) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Active;
            self.registered_at = Some(Instant::now());
        }
    }

    /// Enter the terminal phase; valid from any phase
    pub fn disconnect(&mut self) {
        self.phase = SessionPhase::Disconnected;
    }

    /// Whether events from this session should be processed
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Count one handled inbound event
    pub fn event_handled(&mut self) {
        self.events_received += 1;
    }

    /// Time since the socket was accepted
    pub fn duration(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }
}
