//! Room registry: process-local source of truth for room membership.
//!
//! Two independent room kinds are tracked:
//!
//! - chat-channel rooms keyed by [`ChatRoomKey`]
//! - video-call rooms keyed by [`VideoRoomId`], bounded by a capacity
//!
//! Invariants:
//!
//! - a room with zero members is removed (no empty entries)
//! - a video room never holds more than `video_room_capacity` members
//! - a connection is a member of at most one chat room and one video room;
//!   joining another room of the same kind leaves the current one first
//!
//! The registry is a plain owned value with no interior locking. It is
//! mutated only by the router task, one event at a time.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{
    entity::{
        ChatRoomSnapshot, Connection, DisconnectOutcome, RegistrySnapshot, RoomDeparture,
        VideoJoinOutcome, VideoRoomSnapshot,
    },
    error::RegistryError,
    value_object::{ChatRoomKey, ConnectionId, UserId, VideoRoomId},
};

/// Default maximum number of participants in one video room
pub const DEFAULT_VIDEO_ROOM_CAPACITY: usize = 20;

#[derive(Debug)]
pub struct RoomRegistry {
    video_room_capacity: usize,
    connections: HashMap<ConnectionId, Connection>,
    chat_rooms: BTreeMap<ChatRoomKey, BTreeSet<ConnectionId>>,
    video_rooms: BTreeMap<VideoRoomId, BTreeSet<ConnectionId>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_ROOM_CAPACITY)
    }
}

impl RoomRegistry {
    /// Create an empty registry. A capacity of 0 is raised to 1.
    pub fn new(video_room_capacity: usize) -> Self {
        Self {
            video_room_capacity: video_room_capacity.max(1),
            connections: HashMap::new(),
            chat_rooms: BTreeMap::new(),
            video_rooms: BTreeMap::new(),
        }
    }

    pub fn video_room_capacity(&self) -> usize {
        self.video_room_capacity
    }

    /// Track a new connection. Returns `false` if it was already tracked.
    pub fn register_connection(&mut self, id: ConnectionId, connected_at: i64) -> bool {
        if self.connections.contains_key(&id) {
            return false;
        }
        self.connections
            .insert(id.clone(), Connection::new(id, connected_at));
        true
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    fn connection_mut(&mut self, id: &ConnectionId) -> &mut Connection {
        self.connections
            .entry(id.clone())
            .or_insert_with(|| Connection::new(id.clone(), 0))
    }

    // ========================================
    // Chat rooms
    // ========================================

    /// Add `connection` to the chat room, creating the room if absent.
    ///
    /// Idempotent. If the connection currently sits in a different chat
    /// room it is removed from that room first; the left room is returned.
    pub fn join_chat(&mut self, key: ChatRoomKey, connection: &ConnectionId) -> Option<ChatRoomKey> {
        let previous = match self
            .connections
            .get(connection)
            .and_then(|c| c.chat_room.clone())
        {
            Some(current) if current != key => {
                self.remove_chat_member(&current, connection);
                Some(current)
            }
            _ => None,
        };

        self.chat_rooms
            .entry(key.clone())
            .or_default()
            .insert(connection.clone());
        self.connection_mut(connection).chat_room = Some(key);

        previous
    }

    /// Remove `connection` from the chat room. Returns `false` if it was
    /// not a member (or the room does not exist).
    pub fn leave_chat(&mut self, key: &ChatRoomKey, connection: &ConnectionId) -> bool {
        let removed = self.remove_chat_member(key, connection);
        if let Some(c) = self.connections.get_mut(connection)
            && c.chat_room.as_ref() == Some(key)
        {
            c.chat_room = None;
        }
        removed
    }

    fn remove_chat_member(&mut self, key: &ChatRoomKey, connection: &ConnectionId) -> bool {
        let Some(members) = self.chat_rooms.get_mut(key) else {
            return false;
        };
        let removed = members.remove(connection);
        if members.is_empty() {
            self.chat_rooms.remove(key);
        }
        removed
    }

    // ========================================
    // Video rooms
    // ========================================

    /// Add `connection` to a video room.
    ///
    /// Fails with [`RegistryError::RoomFull`] without touching any
    /// membership when the room already holds `video_room_capacity`
    /// members. On success the connection is first removed from every other
    /// video room (deleting rooms that become empty).
    ///
    /// Joining a room the connection is already in changes nothing.
    pub fn join_video(
        &mut self,
        room_id: VideoRoomId,
        connection: &ConnectionId,
        user_id: UserId,
    ) -> Result<VideoJoinOutcome, RegistryError> {
        if let Some(members) = self.video_rooms.get(&room_id) {
            if members.contains(connection) {
                let others = members
                    .iter()
                    .filter(|m| *m != connection)
                    .cloned()
                    .collect();
                self.connection_mut(connection).user_id = Some(user_id);
                return Ok(VideoJoinOutcome {
                    departures: Vec::new(),
                    others,
                    newly_joined: false,
                });
            }
            if members.len() >= self.video_room_capacity {
                return Err(RegistryError::RoomFull {
                    room_id,
                    capacity: self.video_room_capacity,
                });
            }
        }

        let departures = self.remove_from_video_rooms(connection);

        let members = self.video_rooms.entry(room_id.clone()).or_default();
        let others = members.iter().cloned().collect();
        members.insert(connection.clone());

        let entry = self.connection_mut(connection);
        entry.video_room = Some(room_id);
        entry.user_id = Some(user_id);

        Ok(VideoJoinOutcome {
            departures,
            others,
            newly_joined: true,
        })
    }

    /// Remove `connection` from a video room. `None` if it was not a member.
    pub fn leave_video(
        &mut self,
        room_id: &VideoRoomId,
        connection: &ConnectionId,
    ) -> Option<RoomDeparture> {
        let members = self.video_rooms.get_mut(room_id)?;
        if !members.remove(connection) {
            return None;
        }
        let remaining: Vec<ConnectionId> = members.iter().cloned().collect();
        if members.is_empty() {
            self.video_rooms.remove(room_id);
        }

        if let Some(c) = self.connections.get_mut(connection)
            && c.video_room.as_ref() == Some(room_id)
        {
            c.video_room = None;
        }

        Some(RoomDeparture {
            room_id: room_id.clone(),
            remaining,
        })
    }

    fn remove_from_video_rooms(&mut self, connection: &ConnectionId) -> Vec<RoomDeparture> {
        let mut departures = Vec::new();
        self.video_rooms.retain(|room_id, members| {
            if members.remove(connection) {
                departures.push(RoomDeparture {
                    room_id: room_id.clone(),
                    remaining: members.iter().cloned().collect(),
                });
            }
            !members.is_empty()
        });
        if let Some(c) = self.connections.get_mut(connection) {
            c.video_room = None;
        }
        departures
    }

    // ========================================
    // Disconnect
    // ========================================

    /// Remove `connection` from every chat and video room and forget it.
    ///
    /// Returns the affected rooms so the caller can notify remaining
    /// members. Rooms left empty are deleted.
    pub fn remove_connection_everywhere(&mut self, connection: &ConnectionId) -> DisconnectOutcome {
        let video_departures = self.remove_from_video_rooms(connection);

        let mut chat_rooms = Vec::new();
        self.chat_rooms.retain(|key, members| {
            if members.remove(connection) {
                chat_rooms.push(key.clone());
            }
            !members.is_empty()
        });

        self.connections.remove(connection);

        DisconnectOutcome {
            video_departures,
            chat_rooms,
        }
    }

    // ========================================
    // Queries
    // ========================================

    pub fn video_room_members(&self, room_id: &VideoRoomId) -> Vec<ConnectionId> {
        self.video_rooms
            .get(room_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn chat_room_members(&self, key: &ChatRoomKey) -> Vec<ConnectionId> {
        self.chat_rooms
            .get(key)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_video_room(&self, room_id: &VideoRoomId) -> bool {
        self.video_rooms.contains_key(room_id)
    }

    pub fn has_chat_room(&self, key: &ChatRoomKey) -> bool {
        self.chat_rooms.contains_key(key)
    }

    pub fn video_room_count(&self) -> usize {
        self.video_rooms.len()
    }

    pub fn chat_room_count(&self) -> usize {
        self.chat_rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            video_rooms: self
                .video_rooms
                .iter()
                .map(|(room_id, members)| VideoRoomSnapshot {
                    room_id: room_id.clone(),
                    members: members.iter().cloned().collect(),
                })
                .collect(),
            chat_rooms: self
                .chat_rooms
                .iter()
                .map(|(key, members)| ChatRoomSnapshot {
                    key: key.clone(),
                    members: members.iter().cloned().collect(),
                })
                .collect(),
            connections: self.connections.len(),
        }
    }
}
