//! Domain errors.

use thiserror::Error;

use super::value_object::VideoRoomId;

/// Invalid value object
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("required field '{0}' is empty")]
    Empty(&'static str),
}

/// Registry mutation rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("video room '{room_id}' is full ({capacity} participants)")]
    RoomFull {
        room_id: VideoRoomId,
        capacity: usize,
    },
}

/// Inbound frame could not be turned into an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventValidationError {
    #[error("frame is not a known event: {0}")]
    Undecodable(String),

    #[error("event '{event}' is missing required field '{field}'")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    #[error("unsupported frame type: {0}")]
    UnsupportedFrame(&'static str),
}

/// Outbound push failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ClientNotFound(String),

    #[error("push failed: {0}")]
    PushFailed(String),
}
