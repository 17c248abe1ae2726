//! Router task and its command queue.
//!
//! Connection handlers never touch the registry. They send
//! [`RouterCommand`]s through a cloneable [`Dispatcher`], and a single task
//! drains the queue in arrival order. Commands from one connection are
//! therefore applied in the order that connection sent them.

use tokio::sync::{mpsc, oneshot};

use crate::domain::{ConnectionId, InboundEvent, PusherChannel, RegistrySnapshot};

use super::{error::DispatchError, router::SignalingRouter, SignalingError};

#[derive(Debug)]
pub enum RouterCommand {
    Connect {
        connection_id: ConnectionId,
        sender: PusherChannel,
    },
    Event {
        connection_id: ConnectionId,
        event: InboundEvent,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
}

/// Cloneable handle onto the router task
#[derive(Debug, Clone)]
pub struct Dispatcher {
    commands: mpsc::UnboundedSender<RouterCommand>,
}

impl Dispatcher {
    /// Start the router task. It stops once every `Dispatcher` clone has
    /// been dropped.
    pub fn spawn(router: SignalingRouter) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(router, rx));
        (Self { commands: tx }, handle)
    }

    pub fn connect(
        &self,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), DispatchError> {
        self.send(RouterCommand::Connect {
            connection_id,
            sender,
        })
    }

    pub fn event(&self, connection_id: ConnectionId, event: InboundEvent) -> Result<(), DispatchError> {
        self.send(RouterCommand::Event {
            connection_id,
            event,
        })
    }

    pub fn disconnect(&self, connection_id: ConnectionId) -> Result<(), DispatchError> {
        self.send(RouterCommand::Disconnect { connection_id })
    }

    /// Read a consistent view of all rooms
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(RouterCommand::Snapshot { reply })?;
        rx.await.map_err(|_| DispatchError::RouterClosed)
    }

    fn send(&self, command: RouterCommand) -> Result<(), DispatchError> {
        self.commands
            .send(command)
            .map_err(|_| DispatchError::RouterClosed)
    }
}

async fn run(mut router: SignalingRouter, mut commands: mpsc::UnboundedReceiver<RouterCommand>) {
    tracing::debug!("Signaling router started");
    while let Some(command) = commands.recv().await {
        handle(&mut router, command);
    }
    tracing::debug!("Signaling router stopped");
}

fn handle(router: &mut SignalingRouter, command: RouterCommand) {
    match command {
        RouterCommand::Connect {
            connection_id,
            sender,
        } => router.connect(connection_id, sender),
        RouterCommand::Event {
            connection_id,
            event,
        } => {
            let name = event.name();
            match router.dispatch(&connection_id, event) {
                Ok(()) => {}
                Err(e @ SignalingError::RoomFull { .. }) => {
                    tracing::info!(connection = %connection_id, event = name, "{}", e);
                }
                Err(e @ SignalingError::UnknownTarget(_)) => {
                    tracing::debug!(connection = %connection_id, event = name, "Signal dropped: {}", e);
                }
                Err(e @ SignalingError::MalformedEvent(_)) => {
                    tracing::warn!(connection = %connection_id, event = name, "Event dropped: {}", e);
                }
            }
        }
        RouterCommand::Disconnect { connection_id } => {
            router.disconnect(&connection_id);
        }
        RouterCommand::Snapshot { reply } => {
            // The requester may already be gone
            let _ = reply.send(router.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{ChatRoomKey, RoomRegistry, UserId, VideoRoomId},
        infrastructure::message_pusher::WebSocketMessagePusher,
    };
    use gamehub_shared::{protocol::ServerEvent, time::FixedClock};

    fn spawn() -> (Dispatcher, tokio::task::JoinHandle<()>) {
        Dispatcher::spawn(SignalingRouter::new(
            RoomRegistry::default(),
            Box::new(WebSocketMessagePusher::new()),
            Arc::new(FixedClock::new(0)),
        ))
    }

    #[tokio::test]
    async fn test_commands_are_applied_in_order() {
        // テスト項目: 同じ接続からのコマンドが送信順に適用される
        // given (前提条件):
        let (dispatcher, _handle) = spawn();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let a = ConnectionId::new("a");
        dispatcher.connect(a.clone(), tx).unwrap();

        // when (操作):
        dispatcher
            .event(
                a.clone(),
                InboundEvent::JoinVideoRoom {
                    room_id: VideoRoomId::new("lobby".to_string()).unwrap(),
                    user_id: UserId::new("alice".to_string()).unwrap(),
                },
            )
            .unwrap();
        dispatcher
            .event(
                a.clone(),
                InboundEvent::JoinVideoRoom {
                    room_id: VideoRoomId::new("general".to_string()).unwrap(),
                    user_id: UserId::new("alice".to_string()).unwrap(),
                },
            )
            .unwrap();
        let snapshot = dispatcher.snapshot().await.unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.video_rooms.len(), 1);
        assert_eq!(snapshot.video_rooms[0].room_id.as_str(), "general");
        let first: ServerEvent = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert!(matches!(first, ServerEvent::Connected(_)));
    }

    #[tokio::test]
    async fn test_disconnect_via_dispatcher() {
        // テスト項目: Disconnect コマンドで全てのルームから削除される
        // given (前提条件):
        let (dispatcher, _handle) = spawn();
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = ConnectionId::new("a");
        dispatcher.connect(a.clone(), tx).unwrap();
        dispatcher
            .event(
                a.clone(),
                InboundEvent::JoinChannel(
                    ChatRoomKey::new("guild1".to_string(), "general".to_string()).unwrap(),
                ),
            )
            .unwrap();

        // when (操作):
        dispatcher.disconnect(a).unwrap();
        let snapshot = dispatcher.snapshot().await.unwrap();

        // then (期待する結果):
        assert!(snapshot.chat_rooms.is_empty());
        assert_eq!(snapshot.connections, 0);
    }

    #[tokio::test]
    async fn test_router_stops_when_dispatchers_dropped() {
        // テスト項目: 全ての Dispatcher が破棄されるとルータータスクが終了する
        // given (前提条件):
        let (dispatcher, handle) = spawn();

        // when (操作):
        drop(dispatcher);

        // then (期待する結果):
        assert!(handle.await.is_ok());
    }
}
