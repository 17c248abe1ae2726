//! Outbound delivery abstraction.

use super::{error::MessagePushError, value_object::ConnectionId};

/// Per-connection outbound queue. The receiving half is drained by the
/// connection's socket writer.
pub type PusherChannel = tokio::sync::mpsc::UnboundedSender<String>;

/// Delivers serialized frames to live connections.
///
/// Owned by the router task, so the methods take `&mut self` / `&self`
/// without any locking. Pushing never blocks: frames are queued on the
/// connection's unbounded channel.
#[cfg_attr(test, mockall::automock)]
pub trait MessagePusher: Send {
    fn register_client(&mut self, connection_id: ConnectionId, sender: PusherChannel);

    fn unregister_client(&mut self, connection_id: &ConnectionId);

    /// Push one frame to one connection
    fn push_to(&self, connection_id: &ConnectionId, content: &str) -> Result<(), MessagePushError>;

    /// Push one frame to many connections. Individual failures are logged
    /// and skipped.
    fn broadcast(&self, targets: &[ConnectionId], content: &str);
}
