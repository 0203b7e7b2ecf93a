use airiss_core::CoreError;
use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::job::JobStatus;
use crate::registry::RegistryError;

/// Errors a handler can answer with. Each maps to one status code and a
/// `{"error", "code"}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("dataset {0} not found; upload the file first")]
    DatasetNotFound(String),

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    InvalidUpload(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("job {id} is not finished yet (status: {status})")]
    NotReady { id: String, status: JobStatus },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidRequest(String),

    /// Detail is logged, never returned.
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn job_not_found(id: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: "job",
            id: id.into(),
        }
    }

    pub fn dataset_not_found(id: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: "dataset",
            id: id.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } | ApiError::DatasetNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InvalidUpload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotReady { .. } | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "not_found",
            ApiError::DatasetNotFound(_) => "dataset_not_found",
            ApiError::UnsupportedFormat(_) => "unsupported_format",
            ApiError::InvalidUpload(_) => "invalid_upload",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::NotReady { .. } => "not_ready",
            ApiError::Conflict(_) => "conflict",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(%detail, "request failed");
        }
        let body = Json(json!({ "error": self.to_string(), "code": self.code() }));
        (self.status(), body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnsupportedFormat { .. } => ApiError::UnsupportedFormat(err.to_string()),
            CoreError::Parse { .. } | CoreError::MissingHeader { .. } | CoreError::Csv(_) => {
                ApiError::InvalidUpload(err.to_string())
            }
            CoreError::UnknownMode(_) => ApiError::InvalidRequest(err.to_string()),
            CoreError::Ai(_) | CoreError::Io(_) | CoreError::Json(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::InvalidRequest(rejection.body_text())
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DatasetNotFound(id) => ApiError::DatasetNotFound(id.to_string()),
            RegistryError::JobNotFound(id) => ApiError::job_not_found(id.to_string()),
            RegistryError::JobClosed { .. } | RegistryError::InvalidTransition { .. } => {
                ApiError::Conflict(err.to_string())
            }
            RegistryError::ProgressOutOfRange { .. }
            | RegistryError::ResultCountMismatch { .. }
            | RegistryError::Incomplete { .. } => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
