use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::StorageError;
use serde::Serialize;

use crate::lifecycle::LifecycleError;

/// Structured error response returned by all endpoints on failure.
#[derive(Debug, Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `PAYLOAD_TOO_LARGE`, `UNSUPPORTED_MEDIA_KIND`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,
    /// Human-readable error description.
    #[schema(example = "Species is required")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    PayloadTooLarge(String),
    UnsupportedMediaKind(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, code, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            AppError::UnsupportedMediaKind(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA_KIND",
                msg,
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                )
            }
        };
        (
            status,
            ErrorBody {
                code: code.into(),
                message,
            },
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(id) => AppError::NotFound(format!("Sighting {id} not found")),
            LifecycleError::UnsupportedMediaKind(msg) => AppError::UnsupportedMediaKind(msg),
            LifecycleError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            LifecycleError::StoreUnavailable(_) | LifecycleError::BlobWrite(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidName(_) => {
                AppError::NotFound("Upload not found".into())
            }
            StorageError::SizeLimitExceeded { .. } => AppError::PayloadTooLarge(err.to_string()),
            StorageError::UnsupportedMediaKind(_) => AppError::UnsupportedMediaKind(err.to_string()),
            StorageError::Io(_) => AppError::Internal(err.to_string()),
        }
    }
}
