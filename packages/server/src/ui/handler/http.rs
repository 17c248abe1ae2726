//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    infrastructure::dto::http::{ChatRoomDto, HealthDto, VideoRoomDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto::ok())
}

/// List active video rooms
pub async fn get_video_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VideoRoomDto>>, StatusCode> {
    let snapshot = state.dispatcher.snapshot().await.map_err(|e| {
        tracing::error!("Failed to read rooms: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(
        snapshot
            .video_rooms
            .into_iter()
            .map(VideoRoomDto::from)
            .collect(),
    ))
}

/// List active chat rooms
pub async fn get_chat_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ChatRoomDto>>, StatusCode> {
    let snapshot = state.dispatcher.snapshot().await.map_err(|e| {
        tracing::error!("Failed to read rooms: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(
        snapshot
            .chat_rooms
            .into_iter()
            .map(ChatRoomDto::from)
            .collect(),
    ))
}
