//! Statistics for the signaling relay

pub mod metrics;

pub use metrics::{ServerStats, StatsSnapshot};
