//! Room directory
//!
//! Tracks which connections are members of which room. Rooms are created
//! lazily on first join and deleted eagerly when the last member leaves, so
//! an empty room never exists in the directory.
//!
//! All mutations happen under the directory's write lock, including the
//! joiner's `current_room` update. A join that switches rooms is therefore a
//! single step as far as concurrent readers are concerned: no one can
//! observe a connection joined to neither room.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connection::PeerInfo;
use super::error::RegistryError;
use super::key::{ConnectionId, RoomId};
use super::store::ConnectionRegistry;

/// Result of a join operation
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Snapshot of the joining connection
    pub joiner: PeerInfo,

    /// The *other* members of the room, post-join
    pub peers: Vec<PeerInfo>,

    /// The connection was already a member; nothing was mutated
    pub already_member: bool,

    /// Room the connection implicitly left, with its remaining members
    ///
    /// Set when the join switched rooms. The lifecycle manager notifies the
    /// remaining members so they do not keep a stale view of the leaver.
    pub left: Option<(RoomId, Vec<ConnectionId>)>,
}

/// Result of a leave operation
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    /// Whether the connection was actually a member and got removed
    pub removed: bool,

    /// Members remaining in the room after the removal
    pub remaining: Vec<ConnectionId>,
}

/// Directory of rooms and their members
pub struct RoomDirectory {
    /// Map of room id to member set
    rooms: RwLock<HashMap<RoomId, HashSet<ConnectionId>>>,

    /// Registry consulted for member snapshots and `current_room` updates
    registry: Arc<ConnectionRegistry>,
}

impl RoomDirectory {
    /// Create a new directory backed by the given registry
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            registry,
        }
    }

    /// Join a room, implicitly leaving the previous one
    ///
    /// Duplicate joins (client retries) are no-ops reported via
    /// `already_member`. Fails only when the connection is not registered,
    /// which callers treat as a dropped event.
    pub async fn join(
        &self,
        room_id: &RoomId,
        id: ConnectionId,
    ) -> Result<JoinOutcome, RegistryError> {
        // Lock order: rooms before registry entries, everywhere.
        let mut rooms = self.rooms.write().await;

        let entry_arc = self
            .registry
            .entry(id)
            .await
            .ok_or(RegistryError::ConnectionNotFound(id))?;
        let mut entry = entry_arc.write().await;

        if rooms.get(room_id).is_some_and(|members| members.contains(&id)) {
            tracing::debug!(room = %room_id, connection = %id, "Duplicate join ignored");
            let peers = self.snapshot_members(&rooms, room_id, id).await;
            return Ok(JoinOutcome {
                joiner: entry.info(),
                peers,
                already_member: true,
                left: None,
            });
        }

        // A join always implicitly leaves the previous room.
        let left = match entry.current_room.take() {
            Some(prev) => {
                Self::remove_member(&mut rooms, &prev, id);
                let remaining = Self::member_ids(&rooms, &prev);
                tracing::debug!(
                    room = %prev,
                    connection = %id,
                    "Left previous room on join"
                );
                Some((prev, remaining))
            }
            None => None,
        };

        let members = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(room = %room_id, "Room created");
            HashSet::new()
        });
        members.insert(id);
        let member_count = members.len();

        entry.current_room = Some(room_id.clone());
        let joiner = entry.info();

        let peers = self.snapshot_members(&rooms, room_id, id).await;

        tracing::info!(
            room = %room_id,
            connection = %id,
            identity = %joiner.identity,
            members = member_count,
            "Connection joined room"
        );

        Ok(JoinOutcome {
            joiner,
            peers,
            already_member: false,
            left,
        })
    }

    /// Leave a room
    ///
    /// No-op when the room does not exist or the connection is not a member.
    /// Deletes the room when the last member leaves.
    pub async fn leave(&self, room_id: &RoomId, id: ConnectionId) -> LeaveOutcome {
        let mut rooms = self.rooms.write().await;

        let removed = Self::remove_member(&mut rooms, room_id, id);
        let remaining = Self::member_ids(&rooms, room_id);

        // Clear the reverse index, tolerating a registry record that
        // disconnect cleanup already removed.
        if let Some(entry_arc) = self.registry.entry(id).await {
            let mut entry = entry_arc.write().await;
            if entry.current_room.as_ref() == Some(room_id) {
                entry.current_room = None;
            }
        }

        if removed {
            tracing::info!(
                room = %room_id,
                connection = %id,
                remaining = remaining.len(),
                "Connection left room"
            );
        } else {
            tracing::debug!(room = %room_id, connection = %id, "Leave ignored, not a member");
        }

        LeaveOutcome { removed, remaining }
    }

    /// Member connection ids of a room; empty when the room does not exist
    pub async fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let rooms = self.rooms.read().await;
        Self::member_ids(&rooms, room_id)
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Remove a member from a room's set, deleting the room if it empties
    fn remove_member(
        rooms: &mut HashMap<RoomId, HashSet<ConnectionId>>,
        room_id: &RoomId,
        id: ConnectionId,
    ) -> bool {
        let Some(members) = rooms.get_mut(room_id) else {
            return false;
        };

        let removed = members.remove(&id);
        if removed && members.is_empty() {
            rooms.remove(room_id);
            tracing::info!(room = %room_id, "Room deleted (empty)");
        }
        removed
    }

    fn member_ids(
        rooms: &HashMap<RoomId, HashSet<ConnectionId>>,
        room_id: &RoomId,
    ) -> Vec<ConnectionId> {
        rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot the members of a room excluding one connection
    async fn snapshot_members(
        &self,
        rooms: &HashMap<RoomId, HashSet<ConnectionId>>,
        room_id: &RoomId,
        exclude: ConnectionId,
    ) -> Vec<PeerInfo> {
        let mut peers = Vec::new();
        if let Some(members) = rooms.get(room_id) {
            for member in members {
                if *member == exclude {
                    continue;
                }
                if let Some(info) = self.registry.lookup(*member).await {
                    peers.push(info);
                }
            }
        }
        peers
    }
}
