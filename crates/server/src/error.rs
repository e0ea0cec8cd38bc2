use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use medbill_extract::{AcquisitionError, OcrError, PreprocessError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Boundary errors. Every variant renders as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Bytes that are not an image are the caller's to fix. Re-encoding and
    /// OCR engine failures are ours.
    pub fn from_acquisition(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::Image(PreprocessError::Decode(_))
            | AcquisitionError::Ocr(OcrError::ImageDecode(_)) => ApiError::BadRequest(err.to_string()),
            AcquisitionError::Image(PreprocessError::Encode(_)) | AcquisitionError::Ocr(_) => {
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
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(message) => {
                tracing::debug!(error = %message, "rejected request");
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(message) => {
                tracing::debug!(error = %message, "rejected oversized request");
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
