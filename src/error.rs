use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients. Every variant renders as `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file part")]
    MissingFilePart,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("Failed to open video file")]
    UnreadableVideo,
    #[error("Failed to decode image")]
    InvalidImage(#[source] image::ImageError),
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),
    #[error("Uploaded file exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("Inference failed")]
    Inference(#[source] anyhow::Error),
    #[error("Internal server error")]
    Internal(String),
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {}", e))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(format!("I/O error: {}", e))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFilePart
            | ApiError::NoSelectedFile
            | ApiError::UnreadableVideo
            | ApiError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidImage(_) | ApiError::Inference(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Inference(e) => log::error!("Inference failed: {:#}", e),
            ApiError::Internal(detail) => log::error!("Internal error: {}", detail),
            ApiError::InvalidImage(e) => log::error!("Image decoding failed: {}", e),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
