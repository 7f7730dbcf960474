//! Process-wide counters for the relay
//!
//! Cheap atomic counters, updated on the hot path and read by operators via
//! [`ServerStats::snapshot`]. No history, no aggregation; scrape and graph
//! elsewhere if needed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a running relay
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Connections accepted since start
    pub connections_accepted: AtomicU64,
    /// Currently open connections
    pub connections_active: AtomicU64,
    /// Inbound events parsed successfully
    pub events_received: AtomicU64,
    /// Relays delivered to a live target
    pub relays_delivered: AtomicU64,
    /// Relays dropped (unknown sender or target)
    pub relays_dropped: AtomicU64,
}

impl ServerStats {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        let prev = self.connections_active.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "active connection counter underflow");
    }

    pub(crate) fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn relay_delivered(&self) {
        self.relays_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn relay_dropped(&self) {
        self.relays_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            relays_delivered: self.relays_delivered.load(Ordering::Relaxed),
            relays_dropped: self.relays_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`ServerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub events_received: u64,
    pub relays_delivered: u64,
    pub relays_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = ServerStats::new();

        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        stats.event_received();
        stats.relay_delivered();
        stats.relay_dropped();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.connections_accepted, 2);
        assert_eq!(snapshot.connections_active, 1);
        assert_eq!(snapshot.events_received, 1);
        assert_eq!(snapshot.relays_delivered, 1);
        assert_eq!(snapshot.relays_dropped, 1);
    }
}
