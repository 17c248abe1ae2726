//! Use case errors.
//!
//! None of these leave the router loop: each is logged where it is handled
//! and the loop moves on to the next command.

use thiserror::Error;

use crate::domain::{ConnectionId, EventValidationError, RegistryError, VideoRoomId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    /// Inbound frame dropped at the boundary
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] EventValidationError),

    /// Join rejected; only the requester was notified
    #[error("video room '{room_id}' is full ({capacity} participants)")]
    RoomFull {
        room_id: VideoRoomId,
        capacity: usize,
    },

    /// Relay target is not connected; the signal was dropped
    #[error("unknown relay target '{0}'")]
    UnknownTarget(ConnectionId),
}

impl From<RegistryError> for SignalingError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::RoomFull { room_id, capacity } => Self::RoomFull { room_id, capacity },
        }
    }
}

/// The router task is gone (server shutting down)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("signaling router is closed")]
    RouterClosed,
}
