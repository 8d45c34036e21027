use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::metrics::MetricsError;
use crate::store::StoreError;
use crate::upload::UploadError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Pinning failed: {0}")]
    UpstreamPinFailure(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey(reason) => ApiError::InvalidRequest(reason),
            err => {
                tracing::warn!(error = %err, "Store call failed");
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::EmptyPayload => ApiError::EmptyPayload,
            UploadError::UpstreamPinFailure(text) => ApiError::UpstreamPinFailure(text),
            UploadError::Store(e) => e.into(),
        }
    }
}

impl From<MetricsError> for ApiError {
    fn from(err: MetricsError) -> Self {
        tracing::warn!(error = %err, "Metrics unavailable");
        ApiError::InternalError(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match self {
            ApiError::NotFound(e) => (StatusCode::NOT_FOUND, e, "NOT_FOUND"),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid bearer token".to_string(),
                "UNAUTHORIZED",
            ),
            ApiError::InvalidRequest(e) => (StatusCode::BAD_REQUEST, e, "INVALID_REQUEST"),
            ApiError::EmptyPayload => (
                StatusCode::BAD_REQUEST,
                "Empty payload".to_string(),
                "EMPTY_PAYLOAD",
            ),
            ApiError::UpstreamPinFailure(e) => {
                (StatusCode::BAD_GATEWAY, e, "UPSTREAM_PIN_FAILURE")
            }
            ApiError::InternalError(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": error_code,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
