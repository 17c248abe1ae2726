//! GameHub client core.
//!
//! - `connection`: signaling WebSocket with reader/writer tasks
//! - `peer`: per-remote negotiation state machines and the media engine seam
//! - `video_call`: video room session (capture, join, leave)
//! - `chat`: channel view bound to one chat room
//! - `rest`: REST collaborator (history, uploads, membership)
//! - `cli`: interactive terminal client

pub mod chat;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod peer;
pub mod rest;
pub mod video_call;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ClientConfig, IceServer, NegotiationConfig};
pub use connection::{SignalSender, SignalingConnection};
pub use error::{CallError, ConnectionError, NegotiationError, RestError, SendError, SessionError};
pub use video_call::VideoCall;
