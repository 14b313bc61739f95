//! JSON API handlers.
//!
//! - `GET  /api/controllers` lists every registered controller
//! - `POST /api/messages` dispatches one addressed message

pub mod controllers;
pub mod messages;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// API routes, to be nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/controllers", get(controllers::list))
        .route("/messages", post(messages::send))
}
