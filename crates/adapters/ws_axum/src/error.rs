//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use homelink_domain::error::HubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HubError`] to an HTTP response with appropriate status code.
pub struct ApiError(HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HubError::Malformed(_) | HubError::InvalidAddress(_) | HubError::InvalidValue { .. } => {
                StatusCode::BAD_REQUEST
            }
            HubError::Routing { .. } => StatusCode::NOT_FOUND,
            HubError::Adapter { .. } | HubError::Backend(_) => StatusCode::BAD_GATEWAY,
            HubError::Storage(_) | HubError::Settings(_) => {
                tracing::error!(error = %self.0, "internal error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal server error".to_string(),
                    }),
                )
                    .into_response();
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
