//! Connection lifecycle
//!
//! [`SessionState`] is the transport-side view of one connection
//! (`Connecting -> Active -> Disconnected`); [`LifecycleManager`] is the
//! core-side orchestration that keeps the directories consistent through
//! connect, join/leave, and disconnect.

pub mod lifecycle;
pub mod state;

pub use lifecycle::LifecycleManager;
pub use state::{SessionPhase, SessionState};
