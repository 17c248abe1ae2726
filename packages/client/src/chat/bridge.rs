//! Chat Channel Bridge: one channel view bound to one chat room.

use std::sync::Arc;

use gamehub_shared::{
    message::{ChatMessage, MessageKind},
    protocol::{ClientEvent, ServerEvent},
    time::Clock,
};

use crate::{
    connection::SignalingConnection,
    error::{ConnectionError, SendError},
    rest::{ChannelRef, MessageStore, NewMessage, VoiceClip},
};

use uuid::Uuid;

use super::message_list::MessageList;

/// Who is talking in the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatIdentity {
    pub username: String,
    pub profile_picture: Option<String>,
}

impl ChatIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            profile_picture: None,
        }
    }
}

pub struct ChatBridge {
    connection: SignalingConnection,
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    channel: ChannelRef,
    identity: ChatIdentity,
    messages: MessageList,
}

impl ChatBridge {
    /// Load the history, then join the channel's chat room.
    ///
    /// A failed history load leaves the list empty; the view stays usable.
    pub async fn mount(
        connection: SignalingConnection,
        store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
        channel: ChannelRef,
        identity: ChatIdentity,
    ) -> Result<Self, ConnectionError> {
        let mut messages = MessageList::new();
        match store.fetch_messages(&channel).await {
            Ok(history) => {
                tracing::debug!(
                    server = %channel.server_name,
                    channel = %channel.channel_name,
                    count = history.len(),
                    "History loaded"
                );
                messages.reset(history);
            }
            Err(e) => tracing::error!(
                server = %channel.server_name,
                channel = %channel.channel_name,
                "Failed to fetch messages: {}",
                e
            ),
        }

        connection.send(ClientEvent::join_channel(
            channel.server_name.clone(),
            channel.channel_name.clone(),
        ))?;

        Ok(Self {
            connection,
            store,
            clock,
            channel,
            identity,
            messages,
        })
    }

    pub fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.messages.as_slice()
    }

    /// Persist, append locally, then broadcast to the other viewers
    pub async fn send_text(&mut self, content: &str) -> Result<ChatMessage, SendError> {
        if content.trim().is_empty() {
            return Err(SendError::Empty);
        }
        self.store
            .post_message(
                &self.channel,
                &NewMessage {
                    sender_username: self.identity.username.clone(),
                    content: content.to_string(),
                    kind: MessageKind::Text,
                },
            )
            .await?;

        let message = self.compose(MessageKind::Text, content.to_string());
        self.messages.merge(message.clone());
        self.broadcast(&message);
        Ok(message)
    }

    /// Upload a clip, append it locally, then broadcast its URL
    pub async fn send_voice(&mut self, clip: &VoiceClip) -> Result<ChatMessage, SendError> {
        if clip.bytes.is_empty() {
            return Err(SendError::Empty);
        }
        let file_url = self
            .store
            .upload_voice(&self.channel, &self.identity.username, clip)
            .await?;

        let message = self.compose(MessageKind::Voice, file_url);
        self.messages.merge(message.clone());
        self.broadcast(&message);
        Ok(message)
    }

    /// Merge a relayed message. Returns `true` if it was new.
    pub fn receive(&mut self, message: ChatMessage) -> bool {
        self.messages.merge(message)
    }

    /// Wait for the next relayed message not already displayed.
    ///
    /// Returns `None` once the connection is gone.
    pub async fn next_message(&mut self) -> Option<ChatMessage> {
        while let Some(event) = self.connection.recv().await {
            match event {
                ServerEvent::MessageReceived(message) => {
                    if self.messages.merge(message.clone()) {
                        return Some(message);
                    }
                    tracing::trace!(user = %message.user, "Duplicate message skipped");
                }
                other => tracing::debug!(event = other.name(), "Ignored event in chat view"),
            }
        }
        None
    }

    /// Leave the chat room, then close the connection
    pub async fn unmount(self) {
        if let Err(e) = self.connection.send(ClientEvent::leave_channel(
            self.channel.server_name.clone(),
            self.channel.channel_name.clone(),
        )) {
            tracing::warn!("Failed to leave channel: {}", e);
        }
        self.connection.close().await;
    }

    fn compose(&self, kind: MessageKind, content: String) -> ChatMessage {
        ChatMessage {
            id: Some(Uuid::new_v4().to_string()),
            user: self.identity.username.clone(),
            profile_picture: self.identity.profile_picture.clone(),
            kind,
            content,
            timestamp: self.clock.now_rfc3339(),
        }
    }

    fn broadcast(&self, message: &ChatMessage) {
        let event = ClientEvent::new_message(
            self.channel.server_name.clone(),
            self.channel.channel_name.clone(),
            message.clone(),
        );
        if let Err(e) = self.connection.send(event) {
            tracing::warn!("Message saved but not broadcast: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gamehub_shared::time::FixedClock;

    use super::*;
    use crate::{
        error::RestError,
        rest::MockMessageStore,
        test_support::TestServer,
    };

    fn history() -> Vec<ChatMessage> {
        vec![ChatMessage::text("1", "bob", "earlier", "2024-01-01T00:00:00.000Z")]
    }

    async fn mount(server: &TestServer, store: MockMessageStore) -> ChatBridge {
        mount_as(server, store, "alice").await
    }

    async fn mount_as(server: &TestServer, store: MockMessageStore, user: &str) -> ChatBridge {
        ChatBridge::mount(
            server.connect().await,
            Arc::new(store),
            Arc::new(FixedClock::new(1_704_067_200_000)),
            ChannelRef::new("guild1", "general"),
            ChatIdentity::new(user),
        )
        .await
        .unwrap()
    }

    fn accepting_store() -> MockMessageStore {
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| Ok(Vec::new()));
        store.expect_post_message().returning(|_, _| Ok(()));
        store
    }

    #[tokio::test]
    async fn test_mount_loads_history_and_joins_room() {
        // テスト項目: mount で履歴を読み込み、チャットルームに参加する
        // given (前提条件):
        let server = TestServer::start().await;
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| Ok(history()));

        // when (操作):
        let bridge = mount(&server, store).await;

        // then (期待する結果):
        assert_eq!(bridge.messages().len(), 1);
        server.wait_for_chat_members(1).await;
        bridge.unmount().await;
        server.wait_for_chat_members(0).await;
    }

    #[tokio::test]
    async fn test_mount_survives_history_failure() {
        // テスト項目: 履歴取得に失敗しても空の一覧で mount できる
        // given (前提条件):
        let server = TestServer::start().await;
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| {
            Err(RestError::Status {
                status: 500,
                message: "boom".to_string(),
            })
        });

        // when (操作):
        let bridge = mount(&server, store).await;

        // then (期待する結果):
        assert!(bridge.messages().is_empty());
    }

    #[tokio::test]
    async fn test_send_text_appends_once_despite_echo() {
        // テスト項目: 楽観的に追加したメッセージはブロードキャストの echo で重複しない
        // given (前提条件):
        let server = TestServer::start().await;
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| Ok(history()));
        store
            .expect_post_message()
            .withf(|_, message| message.sender_username == "alice" && message.content == "hello")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut bridge = mount(&server, store).await;
        server.wait_for_chat_members(1).await;

        // when (操作):
        let sent = bridge.send_text("hello").await.unwrap();
        let echo = tokio::time::timeout(Duration::from_millis(300), bridge.next_message()).await;

        // then (期待する結果):
        assert!(echo.is_err(), "echo must be merged silently");
        assert_eq!(bridge.messages().len(), 2);
        assert!(sent.id.as_deref().is_some_and(|id| Uuid::parse_str(id).is_ok()));
        assert_eq!(sent.timestamp, "2024-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_same_millisecond_messages_from_two_senders_both_arrive() {
        // テスト項目: 同じミリ秒に別々の送信者が送ったメッセージはどちらも表示される
        // given (前提条件):
        let server = TestServer::start().await;
        let mut alice = mount_as(&server, accepting_store(), "alice").await;
        let mut bob = mount_as(&server, accepting_store(), "bob").await;
        let mut carol = mount_as(&server, accepting_store(), "carol").await;
        server.wait_for_chat_members(3).await;

        // when (操作):
        let from_alice = alice.send_text("hi from alice").await.unwrap();
        let from_bob = bob.send_text("hi from bob").await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), carol.next_message())
            .await
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), carol.next_message())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(from_alice.timestamp, from_bob.timestamp);
        assert_ne!(from_alice.id, from_bob.id);
        let mut received: Vec<String> = [first, second]
            .into_iter()
            .flatten()
            .map(|m| m.content)
            .collect();
        received.sort();
        assert_eq!(received, vec!["hi from alice", "hi from bob"]);
        assert_eq!(carol.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_send_text_forbidden_maps_to_not_member() {
        // テスト項目: 403 で失敗した送信は NotMember になり一覧に追加されない
        // given (前提条件):
        let server = TestServer::start().await;
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| Ok(Vec::new()));
        store
            .expect_post_message()
            .returning(|_, _| Err(RestError::Forbidden));
        let mut bridge = mount(&server, store).await;

        // when (操作):
        let result = bridge.send_text("hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendError::NotMember)));
        assert!(bridge.messages().is_empty());
    }

    #[tokio::test]
    async fn test_send_text_rejects_blank_input() {
        // テスト項目: 空白だけのメッセージは送信されない
        // given (前提条件):
        let server = TestServer::start().await;
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| Ok(Vec::new()));
        store.expect_post_message().never();
        let mut bridge = mount(&server, store).await;

        // when (操作):
        let result = bridge.send_text("   ").await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendError::Empty)));
    }

    #[tokio::test]
    async fn test_send_voice_uses_uploaded_url() {
        // テスト項目: 音声メッセージはアップロードで得た URL を内容として送られる
        // given (前提条件):
        let server = TestServer::start().await;
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| Ok(Vec::new()));
        store
            .expect_upload_voice()
            .withf(|_, sender, clip| sender.to_string() == "alice" && clip.file_name == "clip.webm")
            .returning(|_, _, _| Ok("/uploads/clip.webm".to_string()));
        let mut bridge = mount(&server, store).await;
        let clip = VoiceClip {
            file_name: "clip.webm".to_string(),
            bytes: vec![1, 2, 3],
        };

        // when (操作):
        let sent = bridge.send_voice(&clip).await.unwrap();

        // then (期待する結果):
        assert_eq!(sent.kind, MessageKind::Voice);
        assert_eq!(sent.content, "/uploads/clip.webm");
        assert_eq!(bridge.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_receive_skips_known_message() {
        // テスト項目: 既に表示済みのメッセージを受信しても一覧は増えない
        // given (前提条件):
        let server = TestServer::start().await;
        let mut store = MockMessageStore::new();
        store.expect_fetch_messages().returning(|_| Ok(history()));
        let mut bridge = mount(&server, store).await;

        // when (操作):
        let duplicate = bridge.receive(history().remove(0));
        let fresh = bridge.receive(ChatMessage::text(
            "2",
            "carol",
            "new",
            "2024-01-01T00:00:05.000Z",
        ));

        // then (期待する結果):
        assert!(!duplicate);
        assert!(fresh);
        assert_eq!(bridge.messages().len(), 2);
    }
}
