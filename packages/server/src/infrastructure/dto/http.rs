//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatRoomSnapshot, ConnectionId, VideoRoomSnapshot};

/// Response body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

impl HealthDto {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// One entry of `GET /api/rooms/video`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRoomDto {
    pub room_id: String,
    pub participants: Vec<ConnectionId>,
}

/// One entry of `GET /api/rooms/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomDto {
    pub server_name: String,
    pub channel_name: String,
    pub members: Vec<ConnectionId>,
}

impl From<VideoRoomSnapshot> for VideoRoomDto {
    fn from(snapshot: VideoRoomSnapshot) -> Self {
        Self {
            room_id: snapshot.room_id.into_string(),
            participants: snapshot.members,
        }
    }
}

impl From<ChatRoomSnapshot> for ChatRoomDto {
    fn from(snapshot: ChatRoomSnapshot) -> Self {
        Self {
            server_name: snapshot.key.server_name().to_string(),
            channel_name: snapshot.key.channel_name().to_string(),
            members: snapshot.members,
        }
    }
}
