//! UseCase: join / leave a chat room
//!
//! Neither sends any notification.

use crate::domain::{ChatRoomKey, ConnectionId, RoomRegistry};

pub struct ChannelMembershipUseCase<'a> {
    registry: &'a mut RoomRegistry,
}

impl<'a> ChannelMembershipUseCase<'a> {
    pub fn new(registry: &'a mut RoomRegistry) -> Self {
        Self { registry }
    }

    /// Join `key`, leaving the current chat room first if it differs
    pub fn join(mut self, connection_id: &ConnectionId, key: ChatRoomKey) {
        let room = key.to_string();
        if let Some(previous) = self.registry.join_chat(key, connection_id) {
            tracing::debug!(connection = %connection_id, room = %previous, "Left previous chat room");
        }
        tracing::info!(connection = %connection_id, room = %room, "Joined chat room");
    }

    pub fn leave(mut self, connection_id: &ConnectionId, key: &ChatRoomKey) {
        if self.registry.leave_chat(key, connection_id) {
            tracing::info!(connection = %connection_id, room = %key, "Left chat room");
        } else {
            tracing::debug!(connection = %connection_id, room = %key, "Not a member; leave ignored");
        }
    }
}
