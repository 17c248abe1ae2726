//! Displayed message list with idempotent merge.

use gamehub_shared::message::ChatMessage;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageList {
    messages: Vec<ChatMessage>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list (history load)
    pub fn reset(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// Append unless an entry with the same id, or the same timestamp and
    /// sender, is already present. Returns whether the list changed.
    pub fn merge(&mut self, message: ChatMessage) -> bool {
        if self.contains(&message) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn contains(&self, message: &ChatMessage) -> bool {
        self.messages.iter().any(|m| m.is_same_as(message))
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, user: &str, timestamp: &str) -> ChatMessage {
        ChatMessage::text(id, user, "hi", timestamp)
    }

    #[test]
    fn test_merge_same_id_is_noop() {
        // テスト項目: 同じ id のメッセージを再度マージしても一覧は変わらない
        // given (前提条件):
        let mut list = MessageList::new();
        list.merge(msg("1", "alice", "2024-01-01T00:00:00.000Z"));
        let before = list.clone();

        // when (操作):
        let changed = list.merge(msg("1", "alice", "2024-01-01T00:00:09.000Z"));

        // then (期待する結果):
        assert!(!changed);
        assert_eq!(list, before);
    }

    #[test]
    fn test_merge_same_timestamp_and_sender_is_noop() {
        // テスト項目: id が異なっても timestamp と送信者が同じなら重複として扱う
        // given (前提条件):
        let mut list = MessageList::new();
        list.merge(msg("1", "alice", "2024-01-01T00:00:00.000Z"));

        // when (操作):
        let changed = list.merge(msg("2", "alice", "2024-01-01T00:00:00.000Z"));

        // then (期待する結果):
        assert!(!changed);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_merge_appends_in_order() {
        // テスト項目: 新しいメッセージは末尾に追加される
        // given (前提条件):
        let mut list = MessageList::new();
        list.reset(vec![msg("1", "alice", "2024-01-01T00:00:00.000Z")]);

        // when (操作):
        let changed = list.merge(msg("2", "bob", "2024-01-01T00:00:00.000Z"));

        // then (期待する結果):
        assert!(changed);
        let users: Vec<&str> = list.as_slice().iter().map(|m| m.user.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[test]
    fn test_merge_is_idempotent_over_replays() {
        // テスト項目: 任意の配送列を二重に流しても結果は一度流した場合と同じ
        // given (前提条件):
        let deliveries: Vec<ChatMessage> = (0..30u32)
            .map(|i| {
                let n = (i * 7 + 3) % 11;
                msg(&n.to_string(), &format!("user{}", n % 3), &format!("2024-01-01T00:00:{:02}.000Z", n))
            })
            .collect();
        let mut once = MessageList::new();
        for m in &deliveries {
            once.merge(m.clone());
        }

        // when (操作):
        let mut twice = MessageList::new();
        for m in deliveries.iter().chain(deliveries.iter()) {
            twice.merge(m.clone());
        }

        // then (期待する結果):
        assert_eq!(once, twice);
        assert_eq!(once.len(), 11);
    }
}
