//! Helpers shared by use case tests.

use std::collections::HashMap;

use gamehub_shared::protocol::ServerEvent;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::{
    domain::{ChatRoomKey, ConnectionId, MessagePusher, UserId, VideoRoomId},
    infrastructure::message_pusher::WebSocketMessagePusher,
};

pub fn conn(id: &str) -> ConnectionId {
    ConnectionId::new(id)
}

pub fn video(id: &str) -> VideoRoomId {
    VideoRoomId::new(id.to_string()).unwrap()
}

pub fn chat(server: &str, channel: &str) -> ChatRoomKey {
    ChatRoomKey::new(server.to_string(), channel.to_string()).unwrap()
}

pub fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

/// A pusher with one registered queue per id
pub fn connected_pusher(
    ids: &[&str],
) -> (
    WebSocketMessagePusher,
    HashMap<ConnectionId, UnboundedReceiver<String>>,
) {
    let mut pusher = WebSocketMessagePusher::new();
    let mut receivers = HashMap::new();
    for id in ids {
        let (tx, rx) = mpsc::unbounded_channel();
        pusher.register_client(conn(id), tx);
        receivers.insert(conn(id), rx);
    }
    (pusher, receivers)
}

/// Every event queued so far for one connection
pub fn drain(receivers: &mut HashMap<ConnectionId, UnboundedReceiver<String>>, id: &str) -> Vec<ServerEvent> {
    let Some(rx) = receivers.get_mut(&conn(id)) else {
        return Vec::new();
    };
    let mut events = Vec::new();
    while let Ok(json) = rx.try_recv() {
        events.push(serde_json::from_str(&json).unwrap());
    }
    events
}
