//! Video call controller.
//!
//! Owns the capture device and the signaling connection of one video room
//! session, and feeds room events to the [`PeerManager`].

use std::{sync::Arc, time::Duration};

use gamehub_shared::protocol::{ClientEvent, ConnectionId, ServerEvent};
use tokio::sync::watch;

use crate::{
    config::NegotiationConfig,
    connection::SignalingConnection,
    error::CallError,
    peer::{CaptureDevice, PeerManager, PeerTransportFactory, StreamMap},
};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct VideoCall {
    room_id: String,
    connection: SignalingConnection,
    capture: Box<dyn CaptureDevice>,
    peers: PeerManager,
    participants_at_join: Vec<ConnectionId>,
}

impl VideoCall {
    /// Start capture and join the room.
    ///
    /// Resolves once the server accepted the join. On `room_full` capture is
    /// stopped again and the connection closed.
    pub async fn join(
        mut connection: SignalingConnection,
        mut capture: Box<dyn CaptureDevice>,
        factory: Arc<dyn PeerTransportFactory>,
        config: NegotiationConfig,
        room_id: &str,
        user_id: &str,
    ) -> Result<Self, CallError> {
        let local = match capture.start().await {
            Ok(local) => local,
            Err(e) => {
                tracing::error!(room = %room_id, "Cannot access camera or microphone: {}", e);
                connection.close().await;
                return Err(CallError::Media(e));
            }
        };

        let mut peers = PeerManager::new(config, factory, local, connection.sender());
        let accepted = tokio::time::timeout(JOIN_TIMEOUT, async {
            if let Err(e) = connection.send(ClientEvent::join_video_room(room_id, user_id)) {
                return Err(CallError::from(e));
            }
            while let Some(event) = connection.recv().await {
                match event {
                    ServerEvent::JoinedVideoRoom(payload) if payload.room_id == room_id => {
                        return Ok(payload.participants);
                    }
                    ServerEvent::RoomFull(payload) if payload.room_id == room_id => {
                        return Err(CallError::RoomFull(payload.room_id));
                    }
                    other => peers.handle_event(&other),
                }
            }
            Err(CallError::NotConnected)
        })
        .await
        .unwrap_or(Err(CallError::NotConnected));

        match accepted {
            Ok(participants) => {
                tracing::info!(
                    room = %room_id,
                    connection = %connection.connection_id(),
                    participants = participants.len(),
                    "Joined video room"
                );
                Ok(Self {
                    room_id: room_id.to_string(),
                    connection,
                    capture,
                    peers,
                    participants_at_join: participants,
                })
            }
            Err(e) => {
                if let CallError::RoomFull(_) = &e {
                    tracing::info!(room = %room_id, "Video room is full");
                }
                peers.close_all().await;
                capture.stop();
                connection.close().await;
                Err(e)
            }
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn connection_id(&self) -> &ConnectionId {
        self.connection.connection_id()
    }

    /// Members already present when we joined
    pub fn participants_at_join(&self) -> &[ConnectionId] {
        &self.participants_at_join
    }

    pub fn peers(&self) -> &PeerManager {
        &self.peers
    }

    pub fn streams(&self) -> watch::Receiver<StreamMap> {
        self.peers.streams()
    }

    /// Process the next room event. Cancel-safe.
    pub async fn pump(&mut self) -> Result<ServerEvent, CallError> {
        let event = self.connection.recv().await.ok_or(CallError::NotConnected)?;
        match &event {
            ServerEvent::UserJoined(payload) => tracing::info!(
                room = %self.room_id,
                peer = %payload.connection_id,
                user = %payload.user_id,
                "Participant joined"
            ),
            ServerEvent::UserLeft(payload) => tracing::info!(
                room = %self.room_id,
                peer = %payload.connection_id,
                "Participant left"
            ),
            _ => {}
        }
        self.peers.handle_event(&event);
        Ok(event)
    }

    /// Close every peer link, leave the room, and only then release the
    /// capture device.
    pub async fn leave(mut self) {
        self.peers.close_all().await;
        if let Err(e) = self
            .connection
            .send(ClientEvent::leave_video_room(self.room_id.clone()))
        {
            tracing::warn!(room = %self.room_id, "Failed to send leave: {}", e);
        }
        self.capture.stop();
        self.connection.close().await;
        tracing::info!(room = %self.room_id, "Left video room");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TransportError,
        peer::{
            MockCaptureDevice, NegotiationState, SimulatedCapture, SimulatedTransportFactory,
        },
        test_support::TestServer,
    };

    async fn join(server: &TestServer, label: &str) -> Result<VideoCall, CallError> {
        let connection = server.connect().await;
        let factory = Arc::new(SimulatedTransportFactory::new(connection.connection_id().as_str()));
        VideoCall::join(
            connection,
            Box::new(SimulatedCapture::new(label)),
            factory,
            NegotiationConfig::default(),
            "general",
            label,
        )
        .await
    }

    fn both_connected(a: &VideoCall, b: &VideoCall) -> bool {
        a.peers().state_of(b.connection_id()) == Some(NegotiationState::Connected)
            && b.peers().state_of(a.connection_id()) == Some(NegotiationState::Connected)
    }

    #[tokio::test]
    async fn test_two_participants_reach_connected() {
        // テスト項目: 同じ部屋に入った 2 人が交渉を完了し互いのストリームを得る
        // given (前提条件):
        let server = TestServer::start().await;
        let mut a = join(&server, "alice").await.unwrap();
        let mut b = join(&server, "bob").await.unwrap();

        // when (操作):
        let exchange = async {
            while !both_connected(&a, &b) {
                tokio::select! {
                    result = a.pump() => { result.unwrap(); }
                    result = b.pump() => { result.unwrap(); }
                    _ = tokio::time::sleep(Duration::from_millis(10)) => {}
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), exchange)
            .await
            .expect("negotiation finished in time");

        // then (期待する結果):
        assert!(a.participants_at_join().is_empty());
        assert_eq!(b.participants_at_join(), &[a.connection_id().clone()]);
        assert!(a.streams().borrow().contains_key(b.connection_id()));
        assert!(b.streams().borrow().contains_key(a.connection_id()));
    }

    #[tokio::test]
    async fn test_room_full_stops_capture() {
        // テスト項目: 満室の部屋への参加は RoomFull になり、カメラは停止される
        // given (前提条件):
        let server = TestServer::with_capacity(1).await;
        let _first = join(&server, "alice").await.unwrap();
        let mut capture = SimulatedCapture::new("bob");
        let mut device = MockCaptureDevice::new();
        let local = capture.start().await.unwrap();
        device.expect_start().return_once(move || Ok(local));
        device.expect_stop().times(1).return_const(());
        let connection = server.connect().await;

        // when (操作):
        let result = VideoCall::join(
            connection,
            Box::new(device),
            Arc::new(SimulatedTransportFactory::new("bob")),
            NegotiationConfig::default(),
            "general",
            "bob",
        )
        .await;

        // then (期待する結果):
        assert!(matches!(result, Err(CallError::RoomFull(ref room)) if room == "general"));
        server.wait_for_video_participants(1).await;
    }

    #[tokio::test]
    async fn test_capture_failure_prevents_join() {
        // テスト項目: カメラを開けない場合は Media エラーになり部屋に参加しない
        // given (前提条件):
        let server = TestServer::start().await;
        let mut device = MockCaptureDevice::new();
        device
            .expect_start()
            .returning(|| Err(TransportError::Media("permission denied".to_string())));
        device.expect_stop().never();
        let connection = server.connect().await;

        // when (操作):
        let result = VideoCall::join(
            connection,
            Box::new(device),
            Arc::new(SimulatedTransportFactory::new("carol")),
            NegotiationConfig::default(),
            "general",
            "carol",
        )
        .await;

        // then (期待する結果):
        assert!(matches!(result, Err(CallError::Media(_))));
        assert_eq!(server.video_rooms().await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_leave_notifies_remaining_participant() {
        // テスト項目: 退出すると残った参加者の PeerLink が閉じられる
        // given (前提条件):
        let server = TestServer::start().await;
        let a = join(&server, "alice").await.unwrap();
        let mut b = join(&server, "bob").await.unwrap();
        let a_id = a.connection_id().clone();

        // when (操作):
        a.leave().await;
        let left = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                if let ServerEvent::UserLeft(payload) = b.pump().await.unwrap() {
                    return payload.connection_id;
                }
            }
        })
        .await
        .unwrap();

        // then (期待する結果):
        assert_eq!(left, a_id);
        assert!(b.peers().is_tombstoned(&a_id));
        assert_eq!(b.peers().link_count(), 0);
        server.wait_for_video_participants(1).await;
    }
}
