//! UseCase: chat message fan-out
//!
//! The sender already stored the message over REST. This only delivers
//! `message_received` to every member of the chat room, sender included.

use gamehub_shared::{message::ChatMessage, protocol::ServerEvent};

use crate::domain::{ChatRoomKey, ConnectionId, MessagePusher, RoomRegistry};

use super::notify::broadcast_event;

pub struct BroadcastMessageUseCase<'a> {
    registry: &'a RoomRegistry,
    message_pusher: &'a dyn MessagePusher,
}

impl<'a> BroadcastMessageUseCase<'a> {
    pub fn new(registry: &'a RoomRegistry, message_pusher: &'a dyn MessagePusher) -> Self {
        Self {
            registry,
            message_pusher,
        }
    }

    /// Returns the connections the message was fanned out to
    pub fn execute(
        &self,
        connection_id: &ConnectionId,
        room: &ChatRoomKey,
        message: ChatMessage,
    ) -> Vec<ConnectionId> {
        let targets = self.registry.chat_room_members(room);
        if targets.is_empty() {
            tracing::debug!(connection = %connection_id, room = %room, "No viewers for message");
            return targets;
        }

        broadcast_event(
            self.message_pusher,
            &targets,
            &ServerEvent::MessageReceived(message),
        );
        tracing::debug!(
            connection = %connection_id,
            room = %room,
            viewers = targets.len(),
            "Broadcast chat message"
        );

        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{chat, conn, connected_pusher, drain};

    fn hello() -> ChatMessage {
        ChatMessage::text("m1", "alice", "hello", "2025-01-01T00:00:00.000Z")
    }

    #[test]
    fn test_message_reaches_every_member_including_sender() {
        // テスト項目: メッセージは送信者を含むルームの全メンバーに届く
        // given (前提条件):
        let mut registry = RoomRegistry::default();
        let key = chat("guild1", "general");
        for id in ["sender", "v1", "v2"] {
            registry.join_chat(key.clone(), &conn(id));
        }
        let (pusher, mut rx) = connected_pusher(&["sender", "v1", "v2", "elsewhere"]);

        // when (操作):
        let targets =
            BroadcastMessageUseCase::new(&registry, &pusher).execute(&conn("sender"), &key, hello());

        // then (期待する結果):
        assert_eq!(targets.len(), 3);
        for id in ["sender", "v1", "v2"] {
            assert_eq!(
                drain(&mut rx, id),
                vec![ServerEvent::MessageReceived(hello())]
            );
        }
        assert!(drain(&mut rx, "elsewhere").is_empty());
    }

    #[test]
    fn test_message_to_empty_room_goes_nowhere() {
        // テスト項目: 誰もいないルームへのメッセージはどこにも配信されない
        // given (前提条件):
        let registry = RoomRegistry::default();
        let (pusher, mut rx) = connected_pusher(&["a"]);

        // when (操作):
        let targets = BroadcastMessageUseCase::new(&registry, &pusher).execute(
            &conn("a"),
            &chat("guild1", "general"),
            hello(),
        );

        // then (期待する結果):
        assert!(targets.is_empty());
        assert!(drain(&mut rx, "a").is_empty());
    }
}
