//! Error-to-response mapping for API handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use genpaper_common::GenPaperError;
use genpaper_citations::StyleError;

/// API error carrying the status code the taxonomy maps to.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<GenPaperError> for ApiError {
    fn from(err: GenPaperError) -> Self {
        let status = match &err {
            // actionable: the user needs to add or process papers
            GenPaperError::NoRelevantContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GenPaperError::QualityTooLow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GenPaperError::IngestionFailed { .. } | GenPaperError::ChunkingFailed { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            GenPaperError::GenerationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GenPaperError::GenerationAborted => StatusCode::BAD_REQUEST,
            GenPaperError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

impl From<StyleError> for ApiError {
    fn from(err: StyleError) -> Self {
        Self::bad_request(err.to_string())
    }
}
