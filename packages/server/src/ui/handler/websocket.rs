//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, EventValidationError},
    infrastructure::dto::decode_client_frame,
    ui::state::AppState,
    usecase::SignalingError,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives frames from the rx channel and pushes them to the WebSocket sender.
///
/// Frames are queued by the router task (via the `MessagePusher`) and
/// written to this client's socket in order.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionId::new(uuid::Uuid::new_v4().to_string());
    let (sender, mut receiver) = socket.split();

    let (tx, rx) = mpsc::unbounded_channel();
    if let Err(e) = state.dispatcher.connect(connection_id.clone(), tx) {
        tracing::error!(connection = %connection_id, "Cannot register connection: {}", e);
        return;
    }
    tracing::info!(connection = %connection_id, "WebSocket connected");

    let dispatcher = state.dispatcher.clone();
    let recv_connection_id = connection_id.clone();

    // Spawn a task to receive frames from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(connection = %recv_connection_id, "WebSocket error: {}", e);
                    break;
                }
            };

            let decoded = match msg {
                Message::Text(text) => decode_client_frame(text.as_str()),
                Message::Binary(_) => Err(EventValidationError::UnsupportedFrame("binary")),
                Message::Close(_) => {
                    tracing::info!(connection = %recv_connection_id, "Client requested close");
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => continue,
            };

            match decoded {
                Ok(event) => {
                    tracing::debug!(connection = %recv_connection_id, event = event.name(), "Received event");
                    if dispatcher.event(recv_connection_id.clone(), event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let e = SignalingError::from(e);
                    tracing::warn!(connection = %recv_connection_id, "Event dropped: {}", e);
                }
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Err(e) = state.dispatcher.disconnect(connection_id.clone()) {
        tracing::warn!(connection = %connection_id, "Cannot unregister connection: {}", e);
    }
    tracing::info!(connection = %connection_id, "WebSocket disconnected");
}
