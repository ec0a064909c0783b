//! Gateway error type and its OpenAI error-envelope rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use oaibridge_core::{BackendError, ValidationError};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Anything a gateway handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was rejected before reaching the backend.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// No route matches the request path.
    #[error("Unknown route: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Backend(err) => StatusCode::from_u16(err.suggested_status_code())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn body(&self) -> ErrorResponse {
        match self {
            Self::Validation(err) => ErrorResponse::invalid_request(err.to_string()),
            Self::Backend(err) => ErrorResponse::from(err),
            Self::NotFound(path) => ErrorResponse::not_found(path),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {self}");
        } else {
            warn!(status = status.as_u16(), "Request rejected: {self}");
        }
        (status, Json(self.body())).into_response()
    }
}
