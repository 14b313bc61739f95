//! # homelink-adapter-ws-axum
//!
//! Client channel built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Accept **websocket** clients on `/websocket`: register them with the
//!   hub, send them the current state, feed their text frames to the hub
//!   and write replies and broadcasts back
//! - Serve a small **JSON API** (`/api/controllers`, `/api/messages`) for
//!   scripts and diagnostics
//! - Map hub errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `homelink-app` (for the hub) and `homelink-domain` (for the
//! message types). Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
pub mod ws;

#[cfg(test)]
mod test_support;
