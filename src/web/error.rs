use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::audit::AuditError;
use crate::llm::generator::GenerateError;

/// Errors surfaced by the HTTP handlers as `{"detail": "..."}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Could not retrieve database schema.")]
    SchemaUnavailable,

    #[error("LLM Error: {0}")]
    Upstream(String),

    #[error("Failed to write audit log: {0}")]
    Audit(#[from] AuditError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Generation log failures surface like any other upstream failure.
impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Database task execution failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
