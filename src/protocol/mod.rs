//! Wire protocol for the signaling relay
//!
//! One JSON object per WebSocket text frame. Inbound frames deserialize to
//! [`ClientEvent`], outbound frames serialize from [`ServerEvent`]. The
//! relay treats every negotiation payload as an opaque value; only the
//! envelope (tag, addressing fields, sender identification) is interpreted.

pub mod event;

pub use event::{ClientEvent, ServerEvent};
