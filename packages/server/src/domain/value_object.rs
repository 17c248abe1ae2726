//! Value objects.
//!
//! Identifiers arriving in event payloads are validated here; an empty or
//! whitespace-only value never reaches the registry.

use std::fmt;

use serde::Serialize;

use super::error::ValueObjectError;

pub use gamehub_shared::protocol::ConnectionId;

/// Identifier of a video-call room (the channel name is reused as room id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VideoRoomId(String);

impl VideoRoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        require_non_empty("roomId", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for VideoRoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for VideoRoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User identity supplied by the client (not verified server-side)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        require_non_empty("userId", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Chat-channel room key: `(serverName, channelName)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomKey {
    server_name: String,
    channel_name: String,
}

impl ChatRoomKey {
    pub fn new(server_name: String, channel_name: String) -> Result<Self, ValueObjectError> {
        require_non_empty("serverName", &server_name)?;
        require_non_empty("channelName", &channel_name)?;
        Ok(Self {
            server_name,
            channel_name,
        })
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }
}

impl fmt::Display for ChatRoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.server_name, self.channel_name)
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    Ok(())
}
