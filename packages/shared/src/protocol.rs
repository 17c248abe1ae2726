//! Signaling wire protocol.
//!
//! Every frame is a JSON text frame of the form
//! `{"event": "<snake_case name>", "data": {...}}` with camelCase payload
//! fields.
//!
//! Inbound payloads ([`ClientEvent`]) are parsed leniently: absent fields
//! default to empty values so that the server can report exactly which
//! required field is missing when it validates them. Outbound payloads
//! ([`ServerEvent`]) are always complete.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;

/// Opaque identifier of one live signaling connection.
///
/// Assigned by the server on handshake and reassigned on reconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Session description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Local or remote media-capability description exchanged during negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    #[serde(default)]
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Connectivity-path proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

// ========================================
// Client → Server
// ========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinVideoRoomPayload {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveVideoRoomPayload {
    #[serde(default)]
    pub room_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferPayload {
    #[serde(default)]
    pub to: ConnectionId,
    #[serde(default)]
    pub offer: Option<SessionDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    #[serde(default)]
    pub to: ConnectionId,
    #[serde(default)]
    pub answer: Option<SessionDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IceCandidatePayload {
    #[serde(default)]
    pub to: ConnectionId,
    #[serde(default)]
    pub candidate: Option<IceCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPayload {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub channel_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

/// Events sent by a client to the signaling server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinVideoRoom(JoinVideoRoomPayload),
    LeaveVideoRoom(LeaveVideoRoomPayload),
    Offer(OfferPayload),
    Answer(AnswerPayload),
    IceCandidate(IceCandidatePayload),
    JoinChannel(ChannelPayload),
    LeaveChannel(ChannelPayload),
    NewMessage(NewMessagePayload),
}

impl ClientEvent {
    pub fn join_video_room(room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::JoinVideoRoom(JoinVideoRoomPayload {
            room_id: room_id.into(),
            user_id: user_id.into(),
        })
    }

    pub fn leave_video_room(room_id: impl Into<String>) -> Self {
        Self::LeaveVideoRoom(LeaveVideoRoomPayload {
            room_id: room_id.into(),
        })
    }

    pub fn offer(to: ConnectionId, offer: SessionDescription) -> Self {
        Self::Offer(OfferPayload {
            to,
            offer: Some(offer),
        })
    }

    pub fn answer(to: ConnectionId, answer: SessionDescription) -> Self {
        Self::Answer(AnswerPayload {
            to,
            answer: Some(answer),
        })
    }

    pub fn ice_candidate(to: ConnectionId, candidate: IceCandidate) -> Self {
        Self::IceCandidate(IceCandidatePayload {
            to,
            candidate: Some(candidate),
        })
    }

    pub fn join_channel(server_name: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self::JoinChannel(ChannelPayload {
            server_name: server_name.into(),
            channel_name: channel_name.into(),
        })
    }

    pub fn leave_channel(server_name: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self::LeaveChannel(ChannelPayload {
            server_name: server_name.into(),
            channel_name: channel_name.into(),
        })
    }

    pub fn new_message(
        server_name: impl Into<String>,
        channel_name: impl Into<String>,
        message: ChatMessage,
    ) -> Self {
        Self::NewMessage(NewMessagePayload {
            server_name: server_name.into(),
            channel_name: channel_name.into(),
            message: Some(message),
        })
    }

    /// Wire name of the event (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinVideoRoom(_) => "join_video_room",
            Self::LeaveVideoRoom(_) => "leave_video_room",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice_candidate",
            Self::JoinChannel(_) => "join_channel",
            Self::LeaveChannel(_) => "leave_channel",
            Self::NewMessage(_) => "new_message",
        }
    }
}

// ========================================
// Server → Client
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedVideoRoomPayload {
    pub room_id: String,
    /// Other members present when the join was accepted
    pub participants: Vec<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedPayload {
    pub user_id: String,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftPayload {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomFullPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedOffer {
    pub from: ConnectionId,
    pub offer: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedAnswer {
    pub from: ConnectionId,
    pub answer: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedIceCandidate {
    pub from: ConnectionId,
    pub candidate: IceCandidate,
}

/// Events sent by the signaling server to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected(ConnectedPayload),
    JoinedVideoRoom(JoinedVideoRoomPayload),
    UserJoined(UserJoinedPayload),
    UserLeft(UserLeftPayload),
    RoomFull(RoomFullPayload),
    Offer(RelayedOffer),
    Answer(RelayedAnswer),
    IceCandidate(RelayedIceCandidate),
    MessageReceived(ChatMessage),
}

impl ServerEvent {
    pub fn user_left(connection_id: ConnectionId) -> Self {
        Self::UserLeft(UserLeftPayload { connection_id })
    }

    /// Wire name of the event (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::JoinedVideoRoom(_) => "joined_video_room",
            Self::UserJoined(_) => "user_joined",
            Self::UserLeft(_) => "user_left",
            Self::RoomFull(_) => "room_full",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice_candidate",
            Self::MessageReceived(_) => "message_received",
        }
    }
}
