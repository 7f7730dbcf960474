//! Connection lifecycle orchestration
//!
//! Glues the directories and the router together: registration at connect
//! time, membership broadcasts on join/leave, and deterministic cleanup on
//! disconnect. This is the only component that emits membership events
//! (`room-joined`, `user-joined`, `user-left`); relays go through the
//! router it owns.

use std::sync::Arc;

use crate::protocol::{ClientEvent, ServerEvent};
use crate::registry::{
    ConnectionId, ConnectionRegistry, Identity, IdentityDirectory, PeerInfo, RegistryError,
    RoomDirectory, RoomId,
};
use crate::router::{EventSink, Router};
use crate::stats::ServerStats;

/// Drives connect, join/leave, relay dispatch, and disconnect cleanup
pub struct LifecycleManager<S: EventSink> {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomDirectory>,
    identities: Arc<IdentityDirectory>,
    router: Router<S>,
    sink: Arc<S>,
    stats: Arc<ServerStats>,
}

impl<S: EventSink> LifecycleManager<S> {
    /// Wire up a lifecycle manager over shared directories and a sink
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomDirectory>,
        identities: Arc<IdentityDirectory>,
        sink: Arc<S>,
        stats: Arc<ServerStats>,
    ) -> Self {
        let router = Router::new(
            Arc::clone(&registry),
            Arc::clone(&identities),
            Arc::clone(&sink),
            Arc::clone(&stats),
        );

        Self {
            registry,
            rooms,
            identities,
            router,
            sink,
            stats,
        }
    }

    /// Register a connection and bind its identity
    ///
    /// Refuses with [`RegistryError::MissingIdentity`] before any state is
    /// created; the transport must then fail the connection attempt visibly
    /// rather than leaving the client hanging. On success the client is
    /// acked with a `registered` event carrying its connection id.
    pub async fn on_connect(
        &self,
        id: ConnectionId,
        identity: Identity,
        display_name: Option<String>,
    ) -> Result<PeerInfo, RegistryError> {
        let info = self.registry.register(id, identity, display_name).await?;
        self.identities.bind(&info.identity, id).await;

        self.sink
            .send(
                id,
                ServerEvent::Registered {
                    connection_id: info.connection_id,
                    identity: info.identity.clone(),
                    display_name: info.display_name.clone(),
                },
            )
            .await;

        Ok(info)
    }

    /// Dispatch one inbound event from an active connection
    ///
    /// Never fails: per-event problems are logged and dropped so one
    /// misbehaving client cannot disturb the transport loop or other
    /// connections.
    pub async fn handle_event(&self, id: ConnectionId, event: ClientEvent) {
        self.stats.event_received();

        match event {
            ClientEvent::Register { .. } => {
                tracing::warn!(connection = %id, "Duplicate register ignored");
            }
            ClientEvent::JoinRoom { room_id } => self.on_join_room(id, &room_id).await,
            ClientEvent::LeaveRoom { room_id } => self.on_leave_room(id, &room_id).await,
            ClientEvent::Offer {
                target_connection_id,
                sdp_offer,
            } => {
                self.router
                    .relay_offer(id, target_connection_id, sdp_offer)
                    .await;
            }
            ClientEvent::Answer {
                target_connection_id,
                sdp_answer,
            } => {
                self.router
                    .relay_answer(id, target_connection_id, sdp_answer)
                    .await;
            }
            ClientEvent::IceCandidate {
                target_connection_id,
                ice_candidate,
            } => {
                self.router
                    .relay_ice_candidate(id, target_connection_id, ice_candidate)
                    .await;
            }
            ClientEvent::DirectCall {
                callee_identity,
                sdp_offer,
            } => {
                self.router
                    .relay_direct_call(id, &callee_identity, sdp_offer)
                    .await;
            }
            ClientEvent::DirectAnswer {
                caller_identity,
                sdp_answer,
            } => {
                self.router
                    .relay_direct_answer(id, &caller_identity, sdp_answer)
                    .await;
            }
        }
    }

    /// Handle a join: delegate to the directory, then notify
    async fn on_join_room(&self, id: ConnectionId, room_id: &RoomId) {
        let outcome = match self.rooms.join(room_id, id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Join racing disconnect cleanup; drop the event
                tracing::debug!(room = %room_id, connection = %id, error = %e, "Join dropped");
                return;
            }
        };

        if outcome.already_member {
            return;
        }

        // Members of the implicitly vacated room hear about the departure
        // first, so no one ever sees the connection in two rooms.
        if let Some((_, remaining)) = &outcome.left {
            self.broadcast(
                remaining,
                ServerEvent::UserLeft {
                    identity: outcome.joiner.identity.clone(),
                    connection_id: id,
                },
            )
            .await;
        }

        self.sink
            .send(
                id,
                ServerEvent::RoomJoined {
                    room_id: room_id.clone(),
                    members: outcome.peers.clone(),
                },
            )
            .await;

        for peer in &outcome.peers {
            self.sink
                .send(
                    peer.connection_id,
                    ServerEvent::UserJoined {
                        user: outcome.joiner.clone(),
                    },
                )
                .await;
        }
    }

    /// Handle a leave: delegate to the directory, then notify the rest
    async fn on_leave_room(&self, id: ConnectionId, room_id: &RoomId) {
        let Some(info) = self.registry.lookup(id).await else {
            tracing::debug!(room = %room_id, connection = %id, "Leave from unknown connection");
            return;
        };

        let outcome = self.rooms.leave(room_id, id).await;
        if outcome.removed {
            self.broadcast(
                &outcome.remaining,
                ServerEvent::UserLeft {
                    identity: info.identity,
                    connection_id: id,
                },
            )
            .await;
        }
    }

    /// Disconnect cleanup; fires for every connection regardless of cause
    ///
    /// Leaves the current room (with `user-left` broadcast), unbinds the
    /// identity, and removes the registry record. Every step no-ops cleanly
    /// for a connection that never registered or never joined a room.
    pub async fn on_disconnect(&self, id: ConnectionId) {
        let Some(entry) = self.registry.snapshot(id).await else {
            tracing::debug!(connection = %id, "Disconnect for unregistered connection");
            return;
        };

        if let Some(room_id) = entry.current_room.clone() {
            let outcome = self.rooms.leave(&room_id, id).await;
            if outcome.removed {
                self.broadcast(
                    &outcome.remaining,
                    ServerEvent::UserLeft {
                        identity: entry.identity.clone(),
                        connection_id: id,
                    },
                )
                .await;
            }
        }

        self.identities.unbind(&entry.identity, id).await;
        self.registry.remove(id).await;

        tracing::info!(
            connection = %id,
            identity = %entry.identity,
            "Disconnect cleanup complete"
        );
    }

    async fn broadcast(&self, targets: &[ConnectionId], event: ServerEvent) {
        for target in targets {
            self.sink.send(*target, event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(ConnectionId, ServerEvent)>>,
    }

    impl RecordingSink {
        async fn take(&self) -> Vec<(ConnectionId, ServerEvent)> {
            std::mem::take(&mut *self.events.lock().await)
        }

        async fn sent_to(&self, target: ConnectionId) -> Vec<ServerEvent> {
            self.events
                .lock()
                .await
                .iter()
                .filter(|(t, _)| *t == target)
                .map(|(_, e)| e.clone())
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        async fn send(&self, target: ConnectionId, event: ServerEvent) {
            self.events.lock().await.push((target, event));
        }
    }

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomDirectory>,
        identities: Arc<IdentityDirectory>,
        sink: Arc<RecordingSink>,
        lifecycle: LifecycleManager<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomDirectory::new(Arc::clone(&registry)));
        let identities = Arc::new(IdentityDirectory::new());
        let sink = Arc::new(RecordingSink::default());
        let lifecycle = LifecycleManager::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            Arc::clone(&identities),
            Arc::clone(&sink),
            Arc::new(ServerStats::new()),
        );
        Fixture {
            registry,
            rooms,
            identities,
            sink,
            lifecycle,
        }
    }

    async fn connect(fx: &Fixture, id: u64, identity: &str, name: &str) -> ConnectionId {
        let id = ConnectionId(id);
        fx.lifecycle
            .on_connect(id, Identity::new(identity), Some(name.into()))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_missing_identity_refused_without_state() {
        let fx = fixture();

        let result = fx
            .lifecycle
            .on_connect(ConnectionId(1), Identity::new(""), None)
            .await;

        assert_eq!(result.unwrap_err(), RegistryError::MissingIdentity);
        assert_eq!(fx.registry.connection_count().await, 0);
        assert_eq!(fx.identities.identity_count().await, 0);
        assert!(fx.sink.take().await.is_empty());
    }

    #[tokio::test]
    async fn test_connect_acks_with_registered() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;

        let events = fx.sink.sent_to(a).await;
        assert_eq!(
            events,
            vec![ServerEvent::Registered {
                connection_id: a,
                identity: Identity::new("u1"),
                display_name: "Ann".into(),
            }]
        );
        assert_eq!(fx.identities.resolve(&Identity::new("u1")).await, vec![a]);
    }

    /// Two peers meet in a room, exchange an offer, then one disconnects.
    #[tokio::test]
    async fn test_two_peer_room_negotiation() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;
        let b = connect(&fx, 2, "u2", "Bob").await;
        let room = RoomId::new("r1");

        fx.lifecycle
            .handle_event(a, ClientEvent::JoinRoom { room_id: room.clone() })
            .await;
        fx.sink.take().await;

        fx.lifecycle
            .handle_event(b, ClientEvent::JoinRoom { room_id: room.clone() })
            .await;

        // B's snapshot includes A; A is told about B
        let to_b = fx.sink.sent_to(b).await;
        assert_eq!(to_b.len(), 1);
        match &to_b[0] {
            ServerEvent::RoomJoined { room_id, members } => {
                assert_eq!(*room_id, room);
                assert_eq!(members.len(), 1);
                assert_eq!(members[0].connection_id, a);
            }
            other => panic!("expected room-joined, got {other:?}"),
        }
        let to_a = fx.sink.sent_to(a).await;
        assert_eq!(to_a.len(), 1);
        match &to_a[0] {
            ServerEvent::UserJoined { user } => {
                assert_eq!(user.connection_id, b);
                assert_eq!(user.identity, Identity::new("u2"));
            }
            other => panic!("expected user-joined, got {other:?}"),
        }
        fx.sink.take().await;

        // B sends A an offer; A sees B's identity and the untouched payload
        let payload = json!({ "sdp": "v=0 test" });
        fx.lifecycle
            .handle_event(
                b,
                ClientEvent::Offer {
                    target_connection_id: a,
                    sdp_offer: payload.clone(),
                },
            )
            .await;

        let to_a = fx.sink.sent_to(a).await;
        assert_eq!(
            to_a,
            vec![ServerEvent::Offer {
                from_connection_id: b,
                from_identity: Identity::new("u2"),
                from_display_name: "Bob".into(),
                sdp_offer: payload,
            }]
        );
        fx.sink.take().await;

        // B disconnects: A is notified, the room shrinks, u2 unresolvable
        fx.lifecycle.on_disconnect(b).await;

        assert_eq!(fx.rooms.members_of(&room).await, vec![a]);
        let to_a = fx.sink.sent_to(a).await;
        assert_eq!(
            to_a,
            vec![ServerEvent::UserLeft {
                identity: Identity::new("u2"),
                connection_id: b,
            }]
        );
        assert!(fx.identities.resolve(&Identity::new("u2")).await.is_empty());
        assert!(fx.registry.lookup(b).await.is_none());
    }

    /// Joining a second room without leaving moves the connection.
    #[tokio::test]
    async fn test_join_switches_room_and_notifies() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;
        let b = connect(&fx, 2, "u2", "Bob").await;

        fx.lifecycle
            .handle_event(a, ClientEvent::JoinRoom { room_id: RoomId::new("r1") })
            .await;
        fx.lifecycle
            .handle_event(b, ClientEvent::JoinRoom { room_id: RoomId::new("r1") })
            .await;
        fx.sink.take().await;

        fx.lifecycle
            .handle_event(b, ClientEvent::JoinRoom { room_id: RoomId::new("r2") })
            .await;

        // Directory state: B only in r2
        assert_eq!(fx.rooms.members_of(&RoomId::new("r1")).await, vec![a]);
        assert_eq!(fx.rooms.members_of(&RoomId::new("r2")).await, vec![b]);
        assert_eq!(
            fx.registry.current_room(b).await,
            Some(RoomId::new("r2"))
        );

        // A heard that B left r1
        let to_a = fx.sink.sent_to(a).await;
        assert_eq!(
            to_a,
            vec![ServerEvent::UserLeft {
                identity: Identity::new("u2"),
                connection_id: b,
            }]
        );
    }

    /// Sole-member switch deletes the vacated room.
    #[tokio::test]
    async fn test_sole_member_switch_deletes_room() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;

        fx.lifecycle
            .handle_event(a, ClientEvent::JoinRoom { room_id: RoomId::new("r1") })
            .await;
        fx.lifecycle
            .handle_event(a, ClientEvent::JoinRoom { room_id: RoomId::new("r2") })
            .await;

        assert_eq!(fx.rooms.room_count().await, 1);
        assert!(fx.rooms.members_of(&RoomId::new("r1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_join_emits_nothing() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;
        let room = RoomId::new("r1");

        fx.lifecycle
            .handle_event(a, ClientEvent::JoinRoom { room_id: room.clone() })
            .await;
        fx.sink.take().await;

        fx.lifecycle
            .handle_event(a, ClientEvent::JoinRoom { room_id: room.clone() })
            .await;

        assert!(fx.sink.take().await.is_empty());
        assert_eq!(fx.rooms.members_of(&room).await.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_broadcasts_to_remaining() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;
        let b = connect(&fx, 2, "u2", "Bob").await;
        let room = RoomId::new("r1");

        fx.lifecycle
            .handle_event(a, ClientEvent::JoinRoom { room_id: room.clone() })
            .await;
        fx.lifecycle
            .handle_event(b, ClientEvent::JoinRoom { room_id: room.clone() })
            .await;
        fx.sink.take().await;

        fx.lifecycle
            .handle_event(a, ClientEvent::LeaveRoom { room_id: room.clone() })
            .await;

        let to_b = fx.sink.sent_to(b).await;
        assert_eq!(
            to_b,
            vec![ServerEvent::UserLeft {
                identity: Identity::new("u1"),
                connection_id: a,
            }]
        );
        // The leaver is not notified about their own departure
        assert!(fx.sink.sent_to(a).await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_without_room_is_clean() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;
        fx.sink.take().await;

        fx.lifecycle.on_disconnect(a).await;

        assert_eq!(fx.registry.connection_count().await, 0);
        assert_eq!(fx.identities.identity_count().await, 0);
        assert!(fx.sink.take().await.is_empty());

        // A second disconnect for the same id is a no-op
        fx.lifecycle.on_disconnect(a).await;
    }

    #[tokio::test]
    async fn test_event_after_disconnect_is_dropped() {
        let fx = fixture();
        let a = connect(&fx, 1, "u1", "Ann").await;
        let b = connect(&fx, 2, "u2", "Bob").await;
        fx.lifecycle.on_disconnect(b).await;
        fx.sink.take().await;

        // Late events from B's queue arrive after its cleanup finished
        fx.lifecycle
            .handle_event(b, ClientEvent::JoinRoom { room_id: RoomId::new("r1") })
            .await;
        fx.lifecycle
            .handle_event(
                b,
                ClientEvent::Offer {
                    target_connection_id: a,
                    sdp_offer: json!("late"),
                },
            )
            .await;

        assert!(fx.sink.take().await.is_empty());
        assert_eq!(fx.rooms.room_count().await, 0);
    }
}
