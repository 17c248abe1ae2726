//! Error types for the GameHub client.

use thiserror::Error;

use crate::peer::NegotiationState;

/// Signaling connection errors
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The server never sent `connected`
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("signaling connection closed")]
    Closed,
}

/// Errors reported by a peer transport (the media engine)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is in the wrong state: {0}")]
    InvalidState(String),

    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    #[error("invalid ICE candidate: {0}")]
    InvalidCandidate(String),

    #[error("media device error: {0}")]
    Media(String),

    #[error("transport closed")]
    Closed,
}

/// Negotiation failure of one peer link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("cannot {action} in state {state:?}")]
    InvalidTransition {
        state: NegotiationState,
        action: &'static str,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("signaling connection closed")]
    SignalingClosed,
}

/// Video call errors surfaced to the user
#[derive(Debug, Error)]
pub enum CallError {
    /// The room already holds the maximum number of participants
    #[error("video room '{0}' is full")]
    RoomFull(String),

    #[error("not connected to the signaling server")]
    NotConnected,

    #[error("cannot access camera or microphone: {0}")]
    Media(#[source] TransportError),
}

impl From<ConnectionError> for CallError {
    fn from(_: ConnectionError) -> Self {
        Self::NotConnected
    }
}

/// REST collaborator errors
#[derive(Debug, Error)]
pub enum RestError {
    /// HTTP 403: the user is not a member of the server
    #[error("forbidden")]
    Forbidden,

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Chat send errors
#[derive(Debug, Error)]
pub enum SendError {
    /// Shown to the user as "You must join this server to send messages!"
    #[error("you must join this server to send messages")]
    NotMember,

    #[error("message is empty")]
    Empty,

    #[error("failed to send message: {0}")]
    Failed(#[source] RestError),
}

impl From<RestError> for SendError {
    fn from(error: RestError) -> Self {
        match error {
            RestError::Forbidden => Self::NotMember,
            other => Self::Failed(other),
        }
    }
}

/// Failure of one interactive CLI session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Rest(#[from] RestError),

    /// The user declined to join the server
    #[error("not a member of server '{0}'")]
    NotMember(String),

    #[error("connection lost")]
    ConnectionLost,
}
