use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Failures surfaced by the snapshot pipeline and the HTTP layer.
///
/// Persistence failures are deliberately absent: the store logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Could not find location")]
    InvalidLocation,

    #[error("Location or coordinates are required")]
    MissingInput,

    #[error("Malformed request body: {0}")]
    MalformedPayload(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidLocation | AppError::MissingInput => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::MalformedPayload(detail) => {
                tracing::debug!("Rejected request body: {}", detail);
                (StatusCode::BAD_REQUEST, "Malformed request body".to_string())
            }
            AppError::UpstreamUnavailable(detail) => {
                tracing::error!("Upstream fetch failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch data".to_string(),
                )
            }
            AppError::InternalError(detail) => {
                tracing::error!("Unexpected error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal database error".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}
