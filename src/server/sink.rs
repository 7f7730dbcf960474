//! Outbound socket table
//!
//! [`PeerSockets`] holds the write half of every live connection as an
//! unbounded channel sender, and implements [`EventSink`] by serializing
//! events onto the right channel. Pushing to the channel never blocks;
//! actual socket writes happen in each connection's send task.
//!
//! This table is transport plumbing only. Target resolution and liveness
//! decisions belong to the registry; sending to an id with no socket here
//! is a silent no-op (the connection is tearing down).

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::ServerEvent;
use crate::registry::ConnectionId;
use crate::router::EventSink;

/// Per-connection outbound senders, keyed by connection id
pub struct PeerSockets {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Message>>>,
}

impl PeerSockets {
    /// Create an empty socket table
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a connection's outbound channel
    pub(crate) async fn insert(&self, id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.senders.write().await.insert(id, tx);
    }

    /// Detach a connection's outbound channel
    pub(crate) async fn remove(&self, id: ConnectionId) {
        self.senders.write().await.remove(&id);
    }
}

impl Default for PeerSockets {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for PeerSockets {
    async fn send(&self, target: ConnectionId, event: ServerEvent) {
        let tx = self.senders.read().await.get(&target).cloned();
        let Some(tx) = tx else {
            tracing::debug!(connection = %target, "No live socket for outbound event");
            return;
        };

        match serde_json::to_string(&event) {
            Ok(text) => {
                if tx.send(Message::Text(text.into())).is_err() {
                    tracing::debug!(connection = %target, "Outbound channel closed");
                }
            }
            Err(e) => {
                tracing::error!(connection = %target, error = %e, "Failed to serialize event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Identity, RoomId};

    #[tokio::test]
    async fn test_send_serializes_onto_channel() {
        let sockets = PeerSockets::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        sockets.insert(ConnectionId(1), tx).await;

        sockets
            .send(
                ConnectionId(1),
                ServerEvent::RoomJoined {
                    room_id: RoomId::new("r1"),
                    members: vec![],
                },
            )
            .await;

        let msg = rx.recv().await.unwrap();
        let Message::Text(text) = msg else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "room-joined");
        assert_eq!(value["roomId"], "r1");
    }

    #[tokio::test]
    async fn test_send_to_missing_socket_is_noop() {
        let sockets = PeerSockets::new();

        // No panic, no effect
        sockets
            .send(
                ConnectionId(9),
                ServerEvent::UserLeft {
                    identity: Identity::new("u1"),
                    connection_id: ConnectionId(9),
                },
            )
            .await;
    }

    #[tokio::test]
    async fn test_remove_detaches_sender() {
        let sockets = PeerSockets::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        sockets.insert(ConnectionId(1), tx).await;
        sockets.remove(ConnectionId(1)).await;

        sockets
            .send(
                ConnectionId(1),
                ServerEvent::Error {
                    message: "x".into(),
                },
            )
            .await;

        // Channel saw nothing and the sender side is gone
        assert!(rx.try_recv().is_err());
    }
}
