//! Chat message model carried over the signaling connection.
//!
//! The authoritative copy of a message lives in the REST store. The copy
//! relayed here is ephemeral and may be delivered more than once, so
//! consumers merge with [`ChatMessage::is_same_as`].

use serde::{Deserialize, Serialize};

/// Kind of chat message content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text (may embed media URLs such as GIF links)
    #[default]
    Text,
    /// Reference to an uploaded voice clip
    Voice,
}

/// A chat message as relayed between channel viewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Client-generated id (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sender username
    pub user: String,
    /// Sender avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Text, or a voice-clip URL for [`MessageKind::Voice`]
    pub content: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ChatMessage {
    /// Create a text message
    pub fn text(
        id: impl Into<String>,
        user: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            user: user.into(),
            profile_picture: None,
            kind: MessageKind::Text,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Create a voice message pointing at an uploaded clip
    pub fn voice(
        id: impl Into<String>,
        user: impl Into<String>,
        clip_url: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Voice,
            ..Self::text(id, user, clip_url, timestamp)
        }
    }

    /// Two deliveries describe the same message when their ids match, or
    /// when they share both timestamp and sender.
    pub fn is_same_as(&self, other: &ChatMessage) -> bool {
        let same_id = matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b);
        same_id || (self.timestamp == other.timestamp && self.user == other.user)
    }
}
