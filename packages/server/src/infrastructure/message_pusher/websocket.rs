//! MessagePusher backed by WebSocket connections
//!
//! ## Responsibilities
//!
//! - Own one `UnboundedSender` per connection
//! - Deliver frames to clients (push_to, broadcast)
//!
//! ## Notes
//!
//! Senders are created by the UI layer (`ui/handler/websocket.rs`) and
//! handed over in the router's `Connect` command. Only the router task owns
//! this pusher, so it holds no lock.

use std::collections::HashMap;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// MessagePusher backed by WebSocket connections
#[derive(Debug, Default)]
pub struct WebSocketMessagePusher {
    /// Key: connection id, Value: outbound queue
    clients: HashMap<ConnectionId, PusherChannel>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl MessagePusher for WebSocketMessagePusher {
    fn register_client(&mut self, connection_id: ConnectionId, sender: PusherChannel) {
        tracing::debug!(connection = %connection_id, "Client registered to MessagePusher");
        self.clients.insert(connection_id, sender);
    }

    fn unregister_client(&mut self, connection_id: &ConnectionId) {
        if self.clients.remove(connection_id).is_some() {
            tracing::debug!(connection = %connection_id, "Client unregistered from MessagePusher");
        }
    }

    fn push_to(&self, connection_id: &ConnectionId, content: &str) -> Result<(), MessagePushError> {
        let Some(sender) = self.clients.get(connection_id) else {
            return Err(MessagePushError::ClientNotFound(
                connection_id.as_str().to_string(),
            ));
        };
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::trace!(connection = %connection_id, "Pushed frame");
        Ok(())
    }

    fn broadcast(&self, targets: &[ConnectionId], content: &str) {
        for target in targets {
            // Partial delivery is fine
            if let Err(e) = self.push_to(target, content) {
                tracing::warn!(connection = %target, "Skipping broadcast target: {}", e);
            }
        }
    }
}
