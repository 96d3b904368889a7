//! Error responses: every failure becomes `500 {"detail": ...}`.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use w2g_core::{StageError, W2gError};
use w2g_results::SinkError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(status = %self.status, detail = %self.detail, "request failed");
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<W2gError> for ApiError {
    fn from(err: W2gError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<SinkError> for ApiError {
    fn from(err: SinkError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("worker task failed: {}", err))
    }
}

impl From<prometheus::Error> for ApiError {
    fn from(err: prometheus::Error) -> Self {
        Self::internal(err.to_string())
    }
}
