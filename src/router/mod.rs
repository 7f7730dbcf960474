//! Relay routing
//!
//! Stateless dispatch of negotiation payloads from a sender to a resolved
//! target. The router owns no membership state of its own; it consults the
//! connection registry for room-addressed targets and the identity
//! directory for direct calls, then hands the payload to the transport's
//! [`EventSink`] unchanged.
//!
//! Every failure here is per-event and non-fatal: an unknown sender (a
//! message racing disconnect cleanup) or a vanished target is logged and
//! dropped, never surfaced as an error to the transport loop. Retrying is
//! the negotiating parties' problem, not the relay's.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::protocol::ServerEvent;
use crate::registry::{ConnectionId, ConnectionRegistry, Identity, IdentityDirectory, PeerInfo};
use crate::stats::ServerStats;

/// Transport emit capability consumed by the router and lifecycle manager
///
/// `send` must complete without blocking on socket I/O; implementations
/// queue per target connection. Sending to a connection that no longer has
/// a live socket is a silent no-op.
pub trait EventSink: Send + Sync + 'static {
    /// Emit one event to one connection
    fn send(&self, target: ConnectionId, event: ServerEvent) -> impl Future<Output = ()> + Send;
}

/// Point-to-point relay engine
pub struct Router<S: EventSink> {
    registry: Arc<ConnectionRegistry>,
    identities: Arc<IdentityDirectory>,
    sink: Arc<S>,
    stats: Arc<ServerStats>,
}

impl<S: EventSink> Router<S> {
    /// Create a router over the given directories and transport sink
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        identities: Arc<IdentityDirectory>,
        sink: Arc<S>,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            registry,
            identities,
            sink,
            stats,
        }
    }

    /// Forward an SDP offer to a specific connection
    ///
    /// Returns whether the event was delivered to a live target.
    pub async fn relay_offer(
        &self,
        sender: ConnectionId,
        target: ConnectionId,
        sdp_offer: Value,
    ) -> bool {
        let Some(from) = self.sender_info(sender, "offer").await else {
            return false;
        };

        self.deliver(
            target,
            "offer",
            ServerEvent::Offer {
                from_connection_id: from.connection_id,
                from_identity: from.identity,
                from_display_name: from.display_name,
                sdp_offer,
            },
        )
        .await
    }

    /// Forward an SDP answer to a specific connection
    pub async fn relay_answer(
        &self,
        sender: ConnectionId,
        target: ConnectionId,
        sdp_answer: Value,
    ) -> bool {
        let Some(from) = self.sender_info(sender, "answer").await else {
            return false;
        };

        self.deliver(
            target,
            "answer",
            ServerEvent::Answer {
                from_connection_id: from.connection_id,
                from_identity: from.identity,
                sdp_answer,
            },
        )
        .await
    }

    /// Forward an ICE candidate to a specific connection
    pub async fn relay_ice_candidate(
        &self,
        sender: ConnectionId,
        target: ConnectionId,
        ice_candidate: Value,
    ) -> bool {
        let Some(from) = self.sender_info(sender, "ice-candidate").await else {
            return false;
        };

        self.deliver(
            target,
            "ice-candidate",
            ServerEvent::IceCandidate {
                from_connection_id: from.connection_id,
                from_identity: from.identity,
                ice_candidate,
            },
        )
        .await
    }

    /// Ring every connection currently bound to `callee`
    ///
    /// Returns whether at least one live connection was rung.
    pub async fn relay_direct_call(
        &self,
        sender: ConnectionId,
        callee: &Identity,
        sdp_offer: Value,
    ) -> bool {
        let Some(from) = self.sender_info(sender, "direct-call").await else {
            return false;
        };

        let targets = self.identities.resolve(callee).await;
        if targets.is_empty() {
            tracing::debug!(
                callee = %callee,
                from = %from.identity,
                "Direct call dropped, callee not connected"
            );
            self.stats.relay_dropped();
            return false;
        }

        for target in targets {
            self.stats.relay_delivered();
            self.sink
                .send(
                    target,
                    ServerEvent::DirectIncomingCall {
                        caller_identity: from.identity.clone(),
                        sdp_offer: sdp_offer.clone(),
                    },
                )
                .await;
        }
        true
    }

    /// Deliver a direct-call answer to every connection bound to `caller`
    pub async fn relay_direct_answer(
        &self,
        sender: ConnectionId,
        caller: &Identity,
        sdp_answer: Value,
    ) -> bool {
        let Some(from) = self.sender_info(sender, "direct-answer").await else {
            return false;
        };

        let targets = self.identities.resolve(caller).await;
        if targets.is_empty() {
            tracing::debug!(
                caller = %caller,
                from = %from.identity,
                "Direct answer dropped, caller no longer connected"
            );
            self.stats.relay_dropped();
            return false;
        }

        for target in targets {
            self.stats.relay_delivered();
            self.sink
                .send(
                    target,
                    ServerEvent::DirectCallAnswered {
                        callee_identity: from.identity.clone(),
                        sdp_answer: sdp_answer.clone(),
                    },
                )
                .await;
        }
        true
    }

    /// Resolve the sender, dropping the event if it raced disconnect
    async fn sender_info(&self, sender: ConnectionId, kind: &str) -> Option<PeerInfo> {
        let info = self.registry.lookup(sender).await;
        if info.is_none() {
            tracing::debug!(
                connection = %sender,
                kind = kind,
                "Relay from unregistered connection dropped"
            );
            self.stats.relay_dropped();
        }
        info
    }

    /// Emit to a target if it is still registered, dropping otherwise
    async fn deliver(&self, target: ConnectionId, kind: &str, event: ServerEvent) -> bool {
        if self.registry.lookup(target).await.is_none() {
            tracing::debug!(
                target = %target,
                kind = kind,
                "Relay target not found, event dropped"
            );
            self.stats.relay_dropped();
            return false;
        }

        self.stats.relay_delivered();
        self.sink.send(target, event).await;
        true
    }
}
