//! UseCase: leave a video room

use gamehub_shared::protocol::ServerEvent;

use crate::domain::{ConnectionId, MessagePusher, RoomDeparture, RoomRegistry, VideoRoomId};

use super::notify::broadcast_event;

pub struct LeaveVideoRoomUseCase<'a> {
    registry: &'a mut RoomRegistry,
    message_pusher: &'a dyn MessagePusher,
}

impl<'a> LeaveVideoRoomUseCase<'a> {
    pub fn new(registry: &'a mut RoomRegistry, message_pusher: &'a dyn MessagePusher) -> Self {
        Self {
            registry,
            message_pusher,
        }
    }

    /// Remove the connection and notify the remaining members.
    ///
    /// Leaving a room the connection is not in does nothing.
    pub fn execute(mut self, connection_id: &ConnectionId, room_id: &VideoRoomId) -> Option<RoomDeparture> {
        let Some(departure) = self.registry.leave_video(room_id, connection_id) else {
            tracing::debug!(connection = %connection_id, room = %room_id, "Not a member; leave ignored");
            return None;
        };

        broadcast_event(
            self.message_pusher,
            &departure.remaining,
            &ServerEvent::user_left(connection_id.clone()),
        );
        tracing::info!(
            connection = %connection_id,
            room = %room_id,
            remaining = departure.remaining.len(),
            "Left video room"
        );

        Some(departure)
    }
}
