//! UseCase: join a video room
//!
//! - Room full: `room_full` to the sender only, membership untouched
//! - Moving from another room: `user_left` to that room's remaining members
//! - Success: `joined_video_room` to the sender, `user_joined` to the others

use gamehub_shared::protocol::{
    JoinedVideoRoomPayload, RoomFullPayload, ServerEvent, UserJoinedPayload,
};

use crate::domain::{
    ConnectionId, MessagePusher, RegistryError, RoomRegistry, UserId, VideoJoinOutcome,
    VideoRoomId,
};

use super::{
    error::SignalingError,
    notify::{broadcast_event, push_event},
};

pub struct JoinVideoRoomUseCase<'a> {
    registry: &'a mut RoomRegistry,
    message_pusher: &'a dyn MessagePusher,
}

impl<'a> JoinVideoRoomUseCase<'a> {
    pub fn new(registry: &'a mut RoomRegistry, message_pusher: &'a dyn MessagePusher) -> Self {
        Self {
            registry,
            message_pusher,
        }
    }

    pub fn execute(
        mut self,
        connection_id: &ConnectionId,
        room_id: VideoRoomId,
        user_id: UserId,
    ) -> Result<VideoJoinOutcome, SignalingError> {
        let outcome = match self
            .registry
            .join_video(room_id.clone(), connection_id, user_id.clone())
        {
            Ok(outcome) => outcome,
            Err(RegistryError::RoomFull { room_id, capacity }) => {
                let notice = ServerEvent::RoomFull(RoomFullPayload {
                    room_id: room_id.as_str().to_string(),
                });
                if let Err(e) = push_event(self.message_pusher, connection_id, &notice) {
                    tracing::warn!(connection = %connection_id, "Failed to send room_full: {}", e);
                }
                return Err(SignalingError::RoomFull { room_id, capacity });
            }
        };

        for departure in &outcome.departures {
            tracing::info!(
                connection = %connection_id,
                room = %departure.room_id,
                "Left previous video room"
            );
            broadcast_event(
                self.message_pusher,
                &departure.remaining,
                &ServerEvent::user_left(connection_id.clone()),
            );
        }

        let ack = ServerEvent::JoinedVideoRoom(JoinedVideoRoomPayload {
            room_id: room_id.as_str().to_string(),
            participants: outcome.others.clone(),
        });
        if let Err(e) = push_event(self.message_pusher, connection_id, &ack) {
            tracing::warn!(connection = %connection_id, "Failed to send joined_video_room: {}", e);
        }

        if outcome.newly_joined {
            broadcast_event(
                self.message_pusher,
                &outcome.others,
                &ServerEvent::UserJoined(UserJoinedPayload {
                    user_id: user_id.as_str().to_string(),
                    connection_id: connection_id.clone(),
                }),
            );
            tracing::info!(
                connection = %connection_id,
                room = %room_id,
                members = outcome.others.len() + 1,
                "Joined video room"
            );
        }

        Ok(outcome)
    }
}
