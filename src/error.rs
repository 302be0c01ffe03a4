//! Typed errors for extraction, recognition and the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub use crate::model::PreprocessError;

/// Why a single frame produced no keypoints. Never fatal to the session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    #[error("Could not decode frame: {0}")]
    Decode(String),

    #[error("Hand detector failed: {0}")]
    Detector(String),
}

/// Failure to turn a captured sequence into a prediction.
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    #[error("Insufficient frames: {frames} captured, {required} required")]
    InsufficientFrames { frames: usize, required: usize },

    #[error("Invalid sequence: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("Classifier failed: {0}")]
    Classifier(String),
}

/// Errors returned by the HTTP endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Model not ready")]
    ModelNotReady,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::ModelNotReady => (StatusCode::SERVICE_UNAVAILABLE, "MODEL_NOT_READY"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let message = self.to_string();

        log::error!("Request error {status} {error_code}: {message}");

        let body = Json(json!({
            "error_code": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
