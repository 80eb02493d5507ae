//! API error type with structured JSON responses.

use crate::error::{ErrorKind, QuizError, StoreError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{ "error": { "code", "message" } }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Handler errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Pipeline(QuizError),
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::Storage(StoreError::UploadNotFound { upload_id }) => {
                ApiError::NotFound(format!("Upload not found: {upload_id}"))
            }
            other => ApiError::Pipeline(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        QuizError::Storage(err).into()
    }
}

/// Status and code for a pipeline failure.
fn pipeline_status(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::UnsupportedFormat => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
        ErrorKind::ExtractionFailed => (StatusCode::BAD_REQUEST, "EXTRACTION_FAILED"),
        ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        ErrorKind::InsufficientContent => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_CONTENT")
        }
        ErrorKind::ProviderUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE")
        }
        ErrorKind::ProviderError => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        ErrorKind::MalformedResponse => (StatusCode::BAD_GATEWAY, "MALFORMED_RESPONSE"),
        ErrorKind::NoQuestionsGenerated => (StatusCode::BAD_GATEWAY, "NO_QUESTIONS_GENERATED"),
        ErrorKind::InvalidConfig | ErrorKind::Storage => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Pipeline(err) => {
                let (status, code) = pipeline_status(err.kind());
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "API internal error");
                    (status, code, "An internal error occurred".to_string())
                } else {
                    (status, code, err.user_message())
                }
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}
