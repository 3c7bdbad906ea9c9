use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::PayloadError;
use crate::services::renderer::RenderError;

/// Message prefix for failed `/generate` and `/generate/raw` renders.
pub const MAP_FAILURE: &str = "Error generating map";
/// Message prefix for a failed `/generate/all` batch.
pub const MAPS_FAILURE: &str = "Error generating maps";

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl AppError {
    /// Classify a render failure; internal ones are prefixed with `context`.
    pub fn from_render(err: RenderError, context: &str) -> Self {
        match err {
            RenderError::EmptyData | RenderError::EmptyForecast { .. } => {
                AppError::BadRequest(err.to_string())
            }
            RenderError::UnknownCountry { .. } => AppError::NotFound(err.to_string()),
            other => AppError::InternalError(format!("{}: {}", context, other)),
        }
    }
}
