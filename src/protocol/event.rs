//! Wire events
//!
//! JSON-over-WebSocket event shapes. Each frame is one internally tagged
//! object; the `type` tag selects the variant. Negotiation payloads
//! (session descriptions, ICE candidates) are carried as raw
//! `serde_json::Value` and never inspected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{ConnectionId, Identity, PeerInfo, RoomId};

/// Events sent by clients to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// First frame on every connection: claim an identity
    Register {
        identity: Identity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },

    /// Join a room, implicitly leaving the current one
    JoinRoom { room_id: RoomId },

    /// Leave a room
    LeaveRoom { room_id: RoomId },

    /// Forward an SDP offer to a peer discovered via room membership
    Offer {
        target_connection_id: ConnectionId,
        sdp_offer: Value,
    },

    /// Forward an SDP answer back to the offering peer
    Answer {
        target_connection_id: ConnectionId,
        sdp_answer: Value,
    },

    /// Forward an ICE candidate to a peer
    IceCandidate {
        target_connection_id: ConnectionId,
        ice_candidate: Value,
    },

    /// Ring a user by identity instead of room membership
    DirectCall {
        callee_identity: Identity,
        sdp_offer: Value,
    },

    /// Answer a direct call, addressed back by the caller's identity
    DirectAnswer {
        caller_identity: Identity,
        sdp_answer: Value,
    },
}

/// Events sent by the relay to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Registration accepted; tells the client its own connection id
    Registered {
        connection_id: ConnectionId,
        identity: Identity,
        display_name: String,
    },

    /// Join accepted; lists the other members already in the room
    RoomJoined {
        room_id: RoomId,
        members: Vec<PeerInfo>,
    },

    /// Another connection joined the receiver's room
    UserJoined { user: PeerInfo },

    /// A member left the receiver's room (or disconnected)
    UserLeft {
        identity: Identity,
        connection_id: ConnectionId,
    },

    /// Relayed SDP offer
    Offer {
        from_connection_id: ConnectionId,
        from_identity: Identity,
        from_display_name: String,
        sdp_offer: Value,
    },

    /// Relayed SDP answer
    Answer {
        from_connection_id: ConnectionId,
        from_identity: Identity,
        sdp_answer: Value,
    },

    /// Relayed ICE candidate
    IceCandidate {
        from_connection_id: ConnectionId,
        from_identity: Identity,
        ice_candidate: Value,
    },

    /// Incoming direct call, delivered to every connection of the callee
    DirectIncomingCall {
        caller_identity: Identity,
        sdp_offer: Value,
    },

    /// A direct call was answered
    DirectCallAnswered {
        callee_identity: Identity,
        sdp_answer: Value,
    },

    /// Per-event failure report (refused registration, malformed frame)
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_room_wire_shape() {
        let event: ClientEvent =
            serde_json::from_value(json!({ "type": "join-room", "roomId": "r1" })).unwrap();

        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: RoomId::new("r1")
            }
        );
    }

    #[test]
    fn test_register_display_name_is_optional() {
        let event: ClientEvent =
            serde_json::from_value(json!({ "type": "register", "identity": "u1" })).unwrap();

        assert_eq!(
            event,
            ClientEvent::Register {
                identity: Identity::new("u1"),
                display_name: None,
            }
        );
    }

    #[test]
    fn test_offer_payload_is_opaque() {
        let payload = json!({ "sdp": "v=0...", "nested": { "weird": [1, 2, 3] } });
        let event: ClientEvent = serde_json::from_value(json!({
            "type": "offer",
            "targetConnectionId": 7,
            "sdpOffer": payload,
        }))
        .unwrap();

        match event {
            ClientEvent::Offer {
                target_connection_id,
                sdp_offer,
            } => {
                assert_eq!(target_connection_id, ConnectionId(7));
                assert_eq!(sdp_offer, payload);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_server_event_tags_are_kebab_case() {
        let event = ServerEvent::UserLeft {
            identity: Identity::new("u2"),
            connection_id: ConnectionId(3),
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({ "type": "user-left", "identity": "u2", "connectionId": 3 })
        );
    }

    #[test]
    fn test_room_joined_member_shape() {
        let event = ServerEvent::RoomJoined {
            room_id: RoomId::new("r1"),
            members: vec![PeerInfo {
                identity: Identity::new("u1"),
                display_name: "Ann".into(),
                connection_id: ConnectionId(1),
            }],
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "room-joined",
                "roomId": "r1",
                "members": [
                    { "identity": "u1", "displayName": "Ann", "connectionId": 1 }
                ],
            })
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({ "type": "reboot" }));
        assert!(result.is_err());
    }
}
