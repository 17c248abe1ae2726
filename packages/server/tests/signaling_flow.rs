//! End-to-end tests: a real server on an ephemeral port, driven by
//! WebSocket clients.

use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use gamehub_shared::{
    message::ChatMessage,
    protocol::{
        ClientEvent, ConnectionId, JoinedVideoRoomPayload, RelayedAnswer, RelayedIceCandidate,
        RelayedOffer, IceCandidate, ServerEvent, SessionDescription, UserJoinedPayload,
    },
};
use gamehub_signaling::{Server, ServerConfig};
use serde_json::Value;
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const RECV_TIMEOUT: Duration = Duration::from_secs(3);
const SILENCE: Duration = Duration::from_millis(200);

struct TestServer {
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start(video_room_capacity: usize) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
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

    async fn client(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }

    async fn get_json(&self, path: &str) -> Value {
        reqwest::get(format!("http://{}{}", self.addr, path))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Poll until the chat room has `count` members
    async fn wait_for_chat_members(&self, count: usize) {
        for _ in 0..50 {
            let rooms = self.get_json("/api/rooms/chat").await;
            let members = rooms
                .as_array()
                .and_then(|rooms| rooms.first())
                .and_then(|room| room["members"].as_array())
                .map(|m| m.len())
                .unwrap_or(0);
            if members == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("chat room never reached {} members", count);
    }
}

struct TestClient {
    id: ConnectionId,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        let mut client = Self {
            id: ConnectionId::default(),
            ws,
        };
        match client.recv().await {
            ServerEvent::Connected(payload) => client.id = payload.connection_id,
            other => panic!("expected connected, got {:?}", other),
        }
        client
    }

    async fn send(&mut self, event: ClientEvent) {
        let json = serde_json::to_string(&event).unwrap();
        self.send_raw(&json).await;
    }

    async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::text(text.to_string())).await.unwrap();
    }

    async fn recv(&mut self) -> ServerEvent {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for an event")
                .expect("connection closed")
                .unwrap();
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn assert_silent(&mut self) {
        if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(SILENCE, self.ws.next()).await {
            panic!("unexpected event: {}", text.as_str());
        }
    }

    async fn join_video(&mut self, room: &str, user: &str) -> ServerEvent {
        self.send(ClientEvent::join_video_room(room, user)).await;
        self.recv().await
    }
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start(20).await;

    // when (操作):
    let body = server.get_json("/api/health").await;

    // then (期待する結果):
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn test_video_call_negotiation_relay() {
    // テスト項目: A と B が同じビデオルームに参加し、offer / answer / ICE が中継される
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut a = server.client().await;
    let mut b = server.client().await;

    // when (操作): A が空のルームに参加
    let ack_a = a.join_video("general", "alice").await;

    // then (期待する結果): A には ack のみ
    assert_eq!(
        ack_a,
        ServerEvent::JoinedVideoRoom(JoinedVideoRoomPayload {
            room_id: "general".to_string(),
            participants: vec![],
        })
    );
    a.assert_silent().await;

    // when (操作): B が参加
    let ack_b = b.join_video("general", "bob").await;

    // then (期待する結果): A に user_joined が届く
    assert_eq!(
        ack_b,
        ServerEvent::JoinedVideoRoom(JoinedVideoRoomPayload {
            room_id: "general".to_string(),
            participants: vec![a.id.clone()],
        })
    );
    assert_eq!(
        a.recv().await,
        ServerEvent::UserJoined(UserJoinedPayload {
            user_id: "bob".to_string(),
            connection_id: b.id.clone(),
        })
    );

    // when (操作): A → B に offer、B → A に answer、B → A に ICE candidate
    let offer = SessionDescription::offer("v=0 a");
    a.send(ClientEvent::offer(b.id.clone(), offer.clone())).await;
    assert_eq!(
        b.recv().await,
        ServerEvent::Offer(RelayedOffer {
            from: a.id.clone(),
            offer,
        })
    );

    let answer = SessionDescription::answer("v=0 b");
    b.send(ClientEvent::answer(a.id.clone(), answer.clone())).await;
    let candidate = IceCandidate::new("candidate:1 1 udp 2122260223 192.0.2.10 54400 typ host");
    b.send(ClientEvent::ice_candidate(a.id.clone(), candidate.clone()))
        .await;

    // then (期待する結果): 送信順に A に届く
    assert_eq!(
        a.recv().await,
        ServerEvent::Answer(RelayedAnswer {
            from: b.id.clone(),
            answer,
        })
    );
    assert_eq!(
        a.recv().await,
        ServerEvent::IceCandidate(RelayedIceCandidate {
            from: b.id.clone(),
            candidate,
        })
    );
}

#[tokio::test]
async fn test_twenty_first_participant_gets_room_full() {
    // テスト項目: 20 人が参加しているルームへの 21 人目は room_full を受け取り、追加されない
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut members = Vec::new();
    for i in 0..20 {
        let mut client = server.client().await;
        let ack = client.join_video("general", &format!("user{}", i)).await;
        assert!(matches!(ack, ServerEvent::JoinedVideoRoom(_)));
        members.push(client);
    }
    let mut late = server.client().await;

    // when (操作):
    let reply = late.join_video("general", "late").await;

    // then (期待する結果):
    assert!(matches!(reply, ServerEvent::RoomFull(ref p) if p.room_id == "general"));
    let rooms = server.get_json("/api/rooms/video").await;
    assert_eq!(rooms[0]["roomId"], "general");
    assert_eq!(rooms[0]["participants"].as_array().unwrap().len(), 20);
    assert!(
        !rooms[0]["participants"]
            .as_array()
            .unwrap()
            .contains(&Value::String(late.id.as_str().to_string()))
    );
}

#[tokio::test]
async fn test_chat_message_reaches_every_viewer_once() {
    // テスト項目: チャンネル内のメッセージが送信者と 2 人の閲覧者にちょうど 1 回ずつ届く
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut sender = server.client().await;
    let mut viewer1 = server.client().await;
    let mut viewer2 = server.client().await;
    for client in [&mut sender, &mut viewer1, &mut viewer2] {
        client.send(ClientEvent::join_channel("guild1", "general")).await;
    }
    server.wait_for_chat_members(3).await;
    let message = ChatMessage::text("m-1", "alice", "gg", "2025-01-01T12:00:00.000Z");

    // when (操作):
    sender
        .send(ClientEvent::new_message("guild1", "general", message.clone()))
        .await;

    // then (期待する結果):
    for client in [&mut sender, &mut viewer1, &mut viewer2] {
        assert_eq!(client.recv().await, ServerEvent::MessageReceived(message.clone()));
        client.assert_silent().await;
    }
}

#[tokio::test]
async fn test_leave_channel_stops_delivery() {
    // テスト項目: leave_channel 後はメッセージが届かず、空になったルームは削除される
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut a = server.client().await;
    a.send(ClientEvent::join_channel("guild1", "general")).await;
    server.wait_for_chat_members(1).await;

    // when (操作):
    a.send(ClientEvent::leave_channel("guild1", "general")).await;
    server.wait_for_chat_members(0).await;

    // then (期待する結果):
    let rooms = server.get_json("/api/rooms/chat").await;
    assert_eq!(rooms, serde_json::json!([]));
}

#[tokio::test]
async fn test_disconnect_notifies_video_room() {
    // テスト項目: 切断すると同じビデオルームのメンバーに user_left が届く
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut a = server.client().await;
    let mut b = server.client().await;
    a.join_video("general", "alice").await;
    b.join_video("general", "bob").await;
    assert!(matches!(a.recv().await, ServerEvent::UserJoined(_)));
    let b_id = b.id.clone();

    // when (操作):
    b.ws.close(None).await.unwrap();
    drop(b);

    // then (期待する結果):
    assert_eq!(a.recv().await, ServerEvent::user_left(b_id));
    let rooms = server.get_json("/api/rooms/video").await;
    assert_eq!(
        rooms[0]["participants"],
        serde_json::json!([a.id.as_str()])
    );
}

#[tokio::test]
async fn test_leave_video_room_notifies_remaining() {
    // テスト項目: leave_video_room で残りのメンバーに user_left が届く
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut a = server.client().await;
    let mut b = server.client().await;
    a.join_video("general", "alice").await;
    b.join_video("general", "bob").await;
    a.recv().await;

    // when (操作):
    b.send(ClientEvent::leave_video_room("general")).await;

    // then (期待する結果):
    assert_eq!(a.recv().await, ServerEvent::user_left(b.id.clone()));
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    // テスト項目: 不正なフレームは無視され、接続は維持される
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut a = server.client().await;

    // when (操作):
    a.send_raw("not json").await;
    a.send_raw(r#"{"event":"join-room","data":{"roomId":"general"}}"#)
        .await;
    a.send_raw(r#"{"event":"join_video_room","data":{"userId":"alice"}}"#)
        .await;
    a.send_raw(r#"{"event":"join_video_room","data":{"roomId":"general"}}"#)
        .await;
    a.send_raw(r#"{"event":"offer","data":{"to":"","offer":{"type":"offer","sdp":""}}}"#)
        .await;
    a.send_raw(r#"{"event":"answer","data":{"to":"x","answer":{"type":"answer","sdp":""}}}"#)
        .await;
    a.ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();

    // then (期待する結果): 何も返らず、その後の正しいイベントは処理される
    a.assert_silent().await;
    let ack = a.join_video("general", "alice").await;
    assert!(
        matches!(&ack, ServerEvent::JoinedVideoRoom(payload) if payload.participants.is_empty())
    );
}

#[tokio::test]
async fn test_offer_to_unknown_target_is_ignored() {
    // テスト項目: 存在しない宛先への offer は何も起こさない
    // given (前提条件):
    let server = TestServer::start(20).await;
    let mut a = server.client().await;

    // when (操作):
    a.send(ClientEvent::offer(
        ConnectionId::new("no-such-connection"),
        SessionDescription::offer("v=0"),
    ))
    .await;

    // then (期待する結果):
    a.assert_silent().await;
    let ack = a.join_video("general", "alice").await;
    assert!(matches!(ack, ServerEvent::JoinedVideoRoom(_)));
}
