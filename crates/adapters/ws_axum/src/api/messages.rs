//! One-shot message endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use homelink_domain::message::AddressedMessage;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the send endpoint.
pub enum SendResponse {
    Reply(Json<AddressedMessage>),
    NoContent,
}

impl IntoResponse for SendResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Reply(json) => json.into_response(),
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `POST /api/messages`
///
/// The body is one addressed message, exactly as sent over the websocket.
/// Broadcast results go to the connected clients; the response only carries
/// a direct reply.
pub async fn send(State(state): State<AppState>, body: String) -> Result<SendResponse, ApiError> {
    let message = AddressedMessage::from_json(&body)?;
    let reply = state.hub.dispatch(message).await?;
    Ok(reply.map_or(SendResponse::NoContent, |reply| {
        SendResponse::Reply(Json(reply))
    }))
}
