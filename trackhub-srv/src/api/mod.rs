//! HTTP API handlers for trackhub-srv

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

use trackhub_common::Error;

pub mod auth;
pub mod health;
pub mod ingest;
pub mod last;
pub mod list;
pub mod live;
pub mod locations;
pub mod version;

/// Maps the shared error taxonomy onto HTTP responses.
///
/// Client errors surface the violated precondition; internal errors
/// surface a generic message, with detail confined to server logs.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            debug!("client error: {}", self.0);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.0.to_string() })),
            )
                .into_response()
        } else {
            error!("internal error: {}", self.0);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal server error" })),
            )
                .into_response()
        }
    }
}

/// Shorthand for rejecting bad request input.
pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(Error::InvalidInput(message.into()))
}
