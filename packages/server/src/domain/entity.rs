//! Entities owned by the registry.

use super::value_object::{ChatRoomKey, ConnectionId, UserId, VideoRoomId};

/// One live transport session.
///
/// The current chat room and video room are stored here so that a
/// connection's membership is known without scanning every room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    /// Identity last supplied in a `join_video_room` payload
    pub user_id: Option<UserId>,
    pub chat_room: Option<ChatRoomKey>,
    pub video_room: Option<VideoRoomId>,
    /// Unix timestamp (milliseconds)
    pub connected_at: i64,
}

impl Connection {
    pub fn new(id: ConnectionId, connected_at: i64) -> Self {
        Self {
            id,
            user_id: None,
            chat_room: None,
            video_room: None,
            connected_at,
        }
    }
}

/// A connection left a video room; `remaining` are the members to notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDeparture {
    pub room_id: VideoRoomId,
    pub remaining: Vec<ConnectionId>,
}

/// Result of an accepted video-room join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJoinOutcome {
    /// Rooms the connection was moved out of
    pub departures: Vec<RoomDeparture>,
    /// Members of the target room other than the joiner
    pub others: Vec<ConnectionId>,
    /// `false` when the connection was already a member
    pub newly_joined: bool,
}

/// Rooms a disconnected connection was removed from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub video_departures: Vec<RoomDeparture>,
    pub chat_rooms: Vec<ChatRoomKey>,
}

/// Read-only view of one video room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRoomSnapshot {
    pub room_id: VideoRoomId,
    pub members: Vec<ConnectionId>,
}

/// Read-only view of one chat room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoomSnapshot {
    pub key: ChatRoomKey,
    pub members: Vec<ConnectionId>,
}

/// Read-only view of the whole registry, sorted by room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub video_rooms: Vec<VideoRoomSnapshot>,
    pub chat_rooms: Vec<ChatRoomSnapshot>,
    pub connections: usize,
}
