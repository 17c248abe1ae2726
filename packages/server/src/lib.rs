//! Signaling server for chat channels and video-call rooms.
//!
//! Connections exchange JSON events over a WebSocket (`/ws`). A single
//! router task owns the room registry and applies inbound events one at a
//! time, fanning the resulting notifications out to room members.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub use config::ServerConfig;
pub use ui::{Server, ServerError};
