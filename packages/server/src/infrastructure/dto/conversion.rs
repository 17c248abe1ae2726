//! Conversion from wire events to validated domain events.
//!
//! Every required field is checked here. A frame that fails any check is
//! rejected as a whole and never reaches the router.

use gamehub_shared::protocol::{ChannelPayload, ClientEvent};

use crate::domain::{
    ChatRoomKey, ConnectionId, EventValidationError, InboundEvent, Signal, UserId, ValueObjectError, VideoRoomId,
};

/// Parse and validate one text frame
pub fn decode_client_frame(text: &str) -> Result<InboundEvent, EventValidationError> {
    let event: ClientEvent = serde_json::from_str(text)
        .map_err(|e| EventValidationError::Undecodable(e.to_string()))?;
    InboundEvent::try_from(event)
}

fn missing(event: &'static str) -> impl Fn(ValueObjectError) -> EventValidationError {
    move |ValueObjectError::Empty(field)| EventValidationError::MissingField { event, field }
}

fn chat_room_key(
    event: &'static str,
    payload: ChannelPayload,
) -> Result<ChatRoomKey, EventValidationError> {
    ChatRoomKey::new(payload.server_name, payload.channel_name).map_err(missing(event))
}

impl TryFrom<ClientEvent> for InboundEvent {
    type Error = EventValidationError;

    fn try_from(event: ClientEvent) -> Result<Self, Self::Error> {
        let name = event.name();
        match event {
            ClientEvent::JoinVideoRoom(payload) => {
                let room_id = VideoRoomId::new(payload.room_id).map_err(missing(name))?;
                let user_id = UserId::new(payload.user_id).map_err(missing(name))?;
                Ok(Self::JoinVideoRoom { room_id, user_id })
            }
            ClientEvent::LeaveVideoRoom(payload) => Ok(Self::LeaveVideoRoom {
                room_id: VideoRoomId::new(payload.room_id).map_err(missing(name))?,
            }),
            ClientEvent::Offer(payload) => {
                let to = require_target(name, payload.to)?;
                let offer = payload
                    .offer
                    .filter(|d| !d.sdp.trim().is_empty())
                    .ok_or(EventValidationError::MissingField {
                        event: name,
                        field: "offer",
                    })?;
                Ok(Self::Signal {
                    to,
                    signal: Signal::Offer(offer),
                })
            }
            ClientEvent::Answer(payload) => {
                let to = require_target(name, payload.to)?;
                let answer = payload
                    .answer
                    .filter(|d| !d.sdp.trim().is_empty())
                    .ok_or(EventValidationError::MissingField {
                        event: name,
                        field: "answer",
                    })?;
                Ok(Self::Signal {
                    to,
                    signal: Signal::Answer(answer),
                })
            }
            ClientEvent::IceCandidate(payload) => {
                let to = require_target(name, payload.to)?;
                let candidate = payload
                    .candidate
                    .filter(|c| !c.candidate.trim().is_empty())
                    .ok_or(EventValidationError::MissingField {
                        event: name,
                        field: "candidate",
                    })?;
                Ok(Self::Signal {
                    to,
                    signal: Signal::IceCandidate(candidate),
                })
            }
            ClientEvent::JoinChannel(payload) => Ok(Self::JoinChannel(chat_room_key(name, payload)?)),
            ClientEvent::LeaveChannel(payload) => {
                Ok(Self::LeaveChannel(chat_room_key(name, payload)?))
            }
            ClientEvent::NewMessage(payload) => {
                let message = payload.message.ok_or(EventValidationError::MissingField {
                    event: name,
                    field: "message",
                })?;
                let room = ChatRoomKey::new(payload.server_name, payload.channel_name)
                    .map_err(missing(name))?;
                Ok(Self::NewMessage { room, message })
            }
        }
    }
}

fn require_target(
    event: &'static str,
    to: ConnectionId,
) -> Result<ConnectionId, EventValidationError> {
    if to.is_empty() {
        return Err(EventValidationError::MissingField { event, field: "to" });
    }
    Ok(to)
}
