//! Shared state of the axum handlers.

use crate::usecase::Dispatcher;

pub struct AppState {
    /// Handle onto the signaling router task
    pub dispatcher: Dispatcher,
}
