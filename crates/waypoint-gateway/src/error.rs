use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;
use waypoint_core::CoreError;
use waypoint_resolver::ResolveError;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    InvalidShortKey(#[from] CoreError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::InvalidShortKey(e) => {
                (StatusCode::BAD_REQUEST, "invalid_short_key", e.to_string())
            }
            AppError::Resolve(e @ ResolveError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found", e.to_string())
            }
            AppError::Resolve(ResolveError::Storage(e)) => {
                error!(error = %e, "Durable store unavailable during redirect");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unavailable",
                    "link storage is temporarily unavailable".to_string(),
                )
            }
        };

        let body = ErrorResponse { error, message };
        (status, Json(body)).into_response()
    }
}
