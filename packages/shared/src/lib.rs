//! Types and utilities shared by the GameHub signaling server and client.
//!
//! - `protocol`: event envelopes exchanged over the signaling WebSocket
//! - `message`: chat message model carried by `new_message` / `message_received`
//! - `logger`: tracing subscriber setup for the binaries
//! - `time`: clock abstraction and timestamp helpers

pub mod logger;
pub mod message;
pub mod protocol;
pub mod time;
