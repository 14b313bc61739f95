//! Shared application state for axum handlers.

use std::sync::Arc;

use homelink_app::hub::Hub;

/// Application state shared across all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
}

impl AppState {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}
