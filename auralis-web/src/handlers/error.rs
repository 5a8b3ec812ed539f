//! JSON error responses for the survey API

use auralis_core::survey::SurveyError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Error returned by survey API handlers, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Survey operation rejected or failed
    #[error(transparent)]
    Survey(#[from] SurveyError),

    /// Request body was not the expected JSON document
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Survey(e) if e.is_user_error() => StatusCode::BAD_REQUEST,
            ApiError::Survey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Survey API failure: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
