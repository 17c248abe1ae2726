//! axum handlers.

mod http;
mod websocket;

pub use http::{get_chat_rooms, get_video_rooms, health_check};
pub use websocket::websocket_handler;
