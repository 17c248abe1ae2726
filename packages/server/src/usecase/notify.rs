//! Outbound event helpers shared by the use cases.

use gamehub_shared::protocol::ServerEvent;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher};

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!(event = event.name(), "Failed to serialize event: {}", e);
            None
        }
    }
}

/// Serialize and push one event to one connection
pub(crate) fn push_event(
    pusher: &dyn MessagePusher,
    to: &ConnectionId,
    event: &ServerEvent,
) -> Result<(), MessagePushError> {
    let Some(json) = encode(event) else {
        return Err(MessagePushError::PushFailed(format!(
            "could not serialize '{}'",
            event.name()
        )));
    };
    pusher.push_to(to, &json)
}

/// Serialize once and push one event to every target
pub(crate) fn broadcast_event(pusher: &dyn MessagePusher, targets: &[ConnectionId], event: &ServerEvent) {
    if targets.is_empty() {
        return;
    }
    if let Some(json) = encode(event) {
        pusher.broadcast(targets, &json);
    }
}
