//! Websocket client sessions.
//!
//! Every session registers an outbound channel with the hub, receives the
//! current state of every ready controller, then has its text frames
//! processed one at a time. Direct replies go back on the same socket;
//! broadcasts reach it through the hub like any other client.

use std::future;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use homelink_app::hub::Hub;

use crate::state::AppState;

/// `GET /websocket`
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| session(socket, state.hub))
}

async fn session(socket: WebSocket, hub: Arc<Hub>) {
    let (sink, stream) = socket.split();
    let incoming = stream
        .take_while(|frame| future::ready(matches!(frame, Ok(message) if !matches!(message, Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                _ => None,
            })
        });
    let outgoing = sink.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
    });
    serve_client(hub, incoming, outgoing).await;
}

/// Run one client session until `incoming` ends.
///
/// `incoming` yields the client's text frames, `outgoing` receives every
/// frame for the client. The client is removed from the hub on return.
pub async fn serve_client<I, O>(hub: Arc<Hub>, incoming: I, outgoing: O)
where
    I: Stream<Item = String>,
    O: Sink<String> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client = hub.add_client(tx);
    tracing::info!(client = %client, clients = hub.client_count(), "client connected");

    let writer = tokio::spawn(async move {
        let mut outgoing = std::pin::pin!(outgoing);
        while let Some(text) = rx.recv().await {
            if outgoing.send(text).await.is_err() {
                break;
            }
        }
    });

    hub.bootstrap_client(client).await;

    let mut incoming = std::pin::pin!(incoming);
    while let Some(text) = incoming.next().await {
        if let Some(reply) = hub.process_incoming_message(&text).await {
            hub.send_to(client, &reply);
        }
    }

    hub.remove_client(client);
    // Dropping the channel lets the writer drain and stop.
    if writer.await.is_err() {
        tracing::warn!(client = %client, "client writer task failed");
    }
    tracing::info!(client = %client, "client disconnected");
}
