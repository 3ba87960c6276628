//! The error taxonomy used across the HTTP boundary, grounded on the same
//! shape the teacher gives its bootstrap errors: one `thiserror` enum per
//! boundary, converted to a response at the edge rather than threaded
//! through every call site as an HTTP status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("resource not found")]
    NotFound,

    #[error("resource already exists: {0}")]
    Conflict(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("unsupported media type")]
    UnsupportedMediaType,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            tracing::error!(error = %e, "internal error");
        }
        let status = self.status_code();
        let detail = match &self {
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors a stage worker converts into `{success: false, error}` completion
/// envelopes. A worker never lets a panic or bare `?` escape its job loop;
/// see `gen_audio_worker::run_stage_loop`.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("input not found: {0}")]
    MissingInput(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("external tool failed: {0}")]
    ExternalTool(String),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}
