//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use gamehub_shared::time::{Clock, SystemClock};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    domain::RoomRegistry,
    infrastructure::message_pusher::WebSocketMessagePusher,
    usecase::{Dispatcher, SignalingRouter},
};

use super::{
    handler::{get_chat_rooms, get_video_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Signaling server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::default());
/// server.run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for connection timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bind to the configured address and serve until Ctrl+C / SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = SignalingRouter::new(
            RoomRegistry::new(self.config.video_room_capacity),
            Box::new(WebSocketMessagePusher::new()),
            self.clock,
        );
        let (dispatcher, router_task) = Dispatcher::spawn(router);
        let app = build_app(Arc::new(AppState { dispatcher }));

        let local_addr = listener.local_addr()?;
        tracing::info!(
            video_room_capacity = self.config.video_room_capacity,
            "Signaling server listening on {}",
            local_addr
        );
        tracing::info!("Connect to: ws://{}/ws", local_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        // The app and its Dispatcher are gone; stop the router task too
        router_task.abort();
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket endpoint
        .route("/ws", get(websocket_handler))
        // HTTP endpoints
        .route("/api/health", get(health_check))
        .route("/api/rooms/video", get(get_video_rooms))
        .route("/api/rooms/chat", get(get_chat_rooms))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
