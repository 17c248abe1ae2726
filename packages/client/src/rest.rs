//! REST collaborator: message persistence, voice uploads and server
//! membership.
//!
//! The chat history is authoritative here; the signaling connection only
//! relays copies for live viewers.

use async_trait::async_trait;
use gamehub_shared::message::{ChatMessage, MessageKind};
use reqwest::{Client, StatusCode, Url, multipart};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::RestError;

/// A channel inside a server (guild)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    pub server_name: String,
    pub channel_name: String,
}

impl ChannelRef {
    pub fn new(server_name: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            channel_name: channel_name.into(),
        }
    }
}

/// Body of a message creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMessage {
    pub sender_username: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// A message as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

impl From<StoredMessage> for ChatMessage {
    fn from(stored: StoredMessage) -> Self {
        let id = match stored.id {
            Some(Value::String(id)) => Some(id),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        ChatMessage {
            id,
            user: stored.sender.unwrap_or_default(),
            profile_picture: stored.profile_picture,
            kind: stored.kind,
            content: stored.content,
            timestamp: stored.timestamp,
        }
    }
}

/// Recorded audio ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceClip {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file_url: String,
}

#[derive(Debug, Deserialize)]
struct MembershipResponse {
    is_member: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn fetch_messages(&self, channel: &ChannelRef) -> Result<Vec<ChatMessage>, RestError>;

    async fn post_message(&self, channel: &ChannelRef, message: &NewMessage)
    -> Result<(), RestError>;

    /// Upload a voice clip and return the URL (or server-relative path) of
    /// the stored file
    async fn upload_voice(
        &self,
        channel: &ChannelRef,
        sender_username: &str,
        clip: &VoiceClip,
    ) -> Result<String, RestError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerMembership: Send + Sync {
    async fn is_member(&self, server_name: &str, username: &str) -> Result<bool, RestError>;

    async fn join_server(&self, server_name: &str, username: &str) -> Result<(), RestError>;

    async fn leave_server(&self, server_name: &str, username: &str) -> Result<(), RestError>;
}

/// Resolve a media path returned by the store against the API base URL.
/// Absolute http(s) URLs are returned unchanged.
pub fn resolve_media_url(api_base: &str, content: &str) -> String {
    if content.starts_with("http://") || content.starts_with("https://") {
        return content.to_string();
    }
    format!(
        "{}/{}",
        api_base.trim_end_matches('/'),
        content.trim_start_matches('/')
    )
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: &str) -> Result<Self, RestError> {
        let base_url = Url::parse(base_url).map_err(|e| RestError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(RestError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RestError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn messages_url(&self, channel: &ChannelRef) -> Result<Url, RestError> {
        self.url(&[
            "servers",
            &channel.server_name,
            "channels",
            &channel.channel_name,
            "messages",
        ])
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RestError> {
        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(RestError::Forbidden);
        }
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
                .unwrap_or_else(|| status.to_string());
            return Err(RestError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RestError> {
        Ok(Self::check(response).await?.json::<T>().await?)
    }
}

#[async_trait]
impl MessageStore for RestClient {
    async fn fetch_messages(&self, channel: &ChannelRef) -> Result<Vec<ChatMessage>, RestError> {
        let response = self.http.get(self.messages_url(channel)?).send().await?;
        let stored: Vec<StoredMessage> = Self::json(response).await?;
        Ok(stored.into_iter().map(ChatMessage::from).collect())
    }

    async fn post_message(
        &self,
        channel: &ChannelRef,
        message: &NewMessage,
    ) -> Result<(), RestError> {
        let response = self
            .http
            .post(self.messages_url(channel)?)
            .json(message)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upload_voice(
        &self,
        channel: &ChannelRef,
        sender_username: &str,
        clip: &VoiceClip,
    ) -> Result<String, RestError> {
        let url = self.url(&[
            "servers",
            &channel.server_name,
            "channels",
            &channel.channel_name,
            "voice",
        ])?;
        let audio = multipart::Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str("audio/webm")?;
        let form = multipart::Form::new()
            .part("audio", audio)
            .text("sender_username", sender_username.to_string());

        let response = self.http.post(url).multipart(form).send().await?;
        let uploaded: UploadResponse = Self::json(response).await?;
        Ok(uploaded.file_url)
    }
}

#[async_trait]
impl ServerMembership for RestClient {
    async fn is_member(&self, server_name: &str, username: &str) -> Result<bool, RestError> {
        let url = self.url(&["servers", server_name, "is_member", username])?;
        let response = self.http.get(url).send().await?;
        let membership: MembershipResponse = Self::json(response).await?;
        Ok(membership.is_member)
    }

    async fn join_server(&self, server_name: &str, username: &str) -> Result<(), RestError> {
        let url = self.url(&["servers", server_name, "join"])?;
        let response = self
            .http
            .post(url)
            .query(&[("username", username)])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn leave_server(&self, server_name: &str, username: &str) -> Result<(), RestError> {
        let url = self.url(&["servers", server_name, "leave"])?;
        let response = self
            .http
            .post(url)
            .query(&[("username", username)])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
