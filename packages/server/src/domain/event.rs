//! Validated inbound events.
//!
//! Wire frames are decoded and checked at the connection boundary
//! (see `infrastructure::dto::conversion`). Only events whose required
//! fields are present reach the router, so handlers never deal with
//! partially-populated payloads.

use gamehub_shared::{
    message::ChatMessage,
    protocol::{IceCandidate, SessionDescription},
};

use super::value_object::{ChatRoomKey, ConnectionId, UserId, VideoRoomId};

/// Negotiation payload forwarded verbatim between two connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidate),
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice_candidate",
        }
    }
}

/// An inbound event that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    JoinVideoRoom {
        room_id: VideoRoomId,
        user_id: UserId,
    },
    LeaveVideoRoom {
        room_id: VideoRoomId,
    },
    Signal {
        to: ConnectionId,
        signal: Signal,
    },
    JoinChannel(ChatRoomKey),
    LeaveChannel(ChatRoomKey),
    NewMessage {
        room: ChatRoomKey,
        message: ChatMessage,
    },
}

impl InboundEvent {
    /// Wire name of the event (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinVideoRoom { .. } => "join_video_room",
            Self::LeaveVideoRoom { .. } => "leave_video_room",
            Self::Signal { signal, .. } => signal.name(),
            Self::JoinChannel(_) => "join_channel",
            Self::LeaveChannel(_) => "leave_channel",
            Self::NewMessage { .. } => "new_message",
        }
    }
}
