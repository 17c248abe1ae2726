//! axum surface: WebSocket endpoint, read-only HTTP API, server runner.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{Server, ServerError};
