//! Route table of the client channel.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// `/health`, the `/websocket` upgrade and the `/api` JSON routes, traced.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/websocket", get(crate::ws::upgrade))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::hub;

    async fn status_of(uri: &str) -> StatusCode {
        build(AppState::new(hub()))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn should_answer_health_probe() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn should_refuse_websocket_route_without_upgrade_headers() {
        assert!(status_of("/websocket").await.is_client_error());
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_route() {
        assert_eq!(status_of("/dashboard").await, StatusCode::NOT_FOUND);
    }
}
