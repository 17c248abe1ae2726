//! Signaling connection over WebSocket.
//!
//! One reader task turns text frames into [`ServerEvent`]s, one writer task
//! serializes [`ClientEvent`]s. Callers only see channels.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gamehub_shared::protocol::{ClientEvent, ConnectionId, ServerEvent};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::error::ConnectionError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum Outbound {
    Event(ClientEvent),
    Close,
}

/// Cloneable sending half of a signaling connection
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl SignalSender {
    /// A sender whose events are delivered to the returned receiver instead
    /// of a socket. Used to wire components together in-process.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(Outbound::Event(event)) = rx.recv().await {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });
        (Self { tx }, event_rx)
    }

    pub fn send(&self, event: ClientEvent) -> Result<(), ConnectionError> {
        self.tx
            .send(Outbound::Event(event))
            .map_err(|_| ConnectionError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A live connection to the signaling server
pub struct SignalingConnection {
    connection_id: ConnectionId,
    sender: SignalSender,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl SignalingConnection {
    /// Connect and wait for the server to assign a connection id
    pub async fn connect(url: &str) -> Result<Self, ConnectionError> {
        let (ws_stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| ConnectionError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        let (mut write, mut read) = ws_stream.split();

        let connection_id = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(text.as_str()) {
                            Ok(ServerEvent::Connected(payload)) => {
                                return Ok(payload.connection_id);
                            }
                            Ok(other) => {
                                tracing::debug!(event = other.name(), "Event before handshake ignored");
                            }
                            Err(e) => tracing::warn!("Undecodable frame during handshake: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => return Err(ConnectionError::Handshake(e.to_string())),
                }
            }
            Err(ConnectionError::Closed)
        })
        .await
        .map_err(|_| ConnectionError::Handshake("timed out waiting for connected".to_string()))??;

        tracing::info!(connection = %connection_id, "Connected to signaling server");

        let (event_tx, events) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(text.as_str()) {
                            Ok(event) => {
                                if event_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!("Undecodable server frame: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Server closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }
        });

        let (tx, mut outbound) = mpsc::unbounded_channel();
        let writer = tokio::spawn(async move {
            while let Some(item) = outbound.recv().await {
                let event = match item {
                    Outbound::Event(event) => event,
                    Outbound::Close => break,
                };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(event = event.name(), "Failed to serialize event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send event: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        Ok(Self {
            connection_id,
            sender: SignalSender { tx },
            events,
            reader,
            writer,
        })
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn sender(&self) -> SignalSender {
        self.sender.clone()
    }

    pub fn send(&self, event: ClientEvent) -> Result<(), ConnectionError> {
        self.sender.send(event)
    }

    /// Next inbound event; `None` once the connection is gone
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    /// Flush queued events, then close the socket
    pub async fn close(self) {
        let _ = self.sender.tx.send(Outbound::Close);
        if tokio::time::timeout(CLOSE_TIMEOUT, self.writer).await.is_err() {
            tracing::warn!("Timed out closing signaling connection");
        }
        self.reader.abort();
        tracing::info!(connection = %self.connection_id, "Signaling connection closed");
    }
}
