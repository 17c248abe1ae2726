//! UseCase: disconnect cleanup
//!
//! Removes the connection from every room and sends `user_left` to the
//! remaining members of each affected video room. Chat rooms are not
//! notified.

use gamehub_shared::protocol::ServerEvent;

use crate::domain::{ConnectionId, DisconnectOutcome, MessagePusher, RoomRegistry};

use super::notify::broadcast_event;

pub struct DisconnectConnectionUseCase<'a> {
    registry: &'a mut RoomRegistry,
    message_pusher: &'a mut dyn MessagePusher,
}

impl<'a> DisconnectConnectionUseCase<'a> {
    pub fn new(registry: &'a mut RoomRegistry, message_pusher: &'a mut dyn MessagePusher) -> Self {
        Self {
            registry,
            message_pusher,
        }
    }

    pub fn execute(mut self, connection_id: &ConnectionId) -> DisconnectOutcome {
        self.message_pusher.unregister_client(connection_id);
        let outcome = self.registry.remove_connection_everywhere(connection_id);

        for departure in &outcome.video_departures {
            broadcast_event(
                &*self.message_pusher,
                &departure.remaining,
                &ServerEvent::user_left(connection_id.clone()),
            );
        }

        tracing::info!(
            connection = %connection_id,
            video_rooms = outcome.video_departures.len(),
            chat_rooms = outcome.chat_rooms.len(),
            "Connection removed from all rooms"
        );

        outcome
    }
}
