//! Helpers shared by the unit tests: a real signaling server on an
//! ephemeral port.

use std::{net::SocketAddr, time::Duration};

use gamehub_signaling::{Server, ServerConfig};
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot};

use crate::connection::SignalingConnection;

pub(crate) struct TestServer {
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub(crate) async fn start() -> Self {
        Self::with_capacity(20).await
    }

    pub(crate) async fn with_capacity(video_room_capacity: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let config = ServerConfig {
            video_room_capacity,
            ..ServerConfig::default()
        };
        tokio::spawn(Server::new(config).serve(listener, async {
            let _ = rx.await;
        }));
        Self {
            addr,
            _shutdown: shutdown,
        }
    }

    pub(crate) fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub(crate) async fn connect(&self) -> SignalingConnection {
        SignalingConnection::connect(&self.ws_url()).await.unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        reqwest::get(format!("http://{}{}", self.addr, path))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    pub(crate) async fn video_rooms(&self) -> Value {
        self.get_json("/api/rooms/video").await
    }

    fn member_count(rooms: &Value, field: &str) -> usize {
        rooms
            .as_array()
            .and_then(|rooms| rooms.first())
            .and_then(|room| room[field].as_array())
            .map(|members| members.len())
            .unwrap_or(0)
    }

    pub(crate) async fn wait_for_chat_members(&self, count: usize) {
        for _ in 0..100 {
            let rooms = self.get_json("/api/rooms/chat").await;
            if Self::member_count(&rooms, "members") == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("chat room never reached {} members", count);
    }

    pub(crate) async fn wait_for_video_participants(&self, count: usize) {
        for _ in 0..100 {
            let rooms = self.get_json("/api/rooms/video").await;
            if Self::member_count(&rooms, "participants") == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("video room never reached {} participants", count);
    }
}
