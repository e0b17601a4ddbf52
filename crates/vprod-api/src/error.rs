//! API error responses.
//!
//! Every handler error renders as a JSON body `{"detail": ...}` with the
//! matching status code, mirroring what job submitters already parse.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request rejected before a job was created (bad id, bad filter)
    #[error("{0}")]
    Validation(String),

    /// Artifacts already exist and overwrite was not requested
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Store/pipeline failures surfacing through a handler
    #[error(transparent)]
    Pipeline(#[from] vprod_pipeline::PipelineError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Detail string shown to clients. Server-side failures are logged in
    /// full but collapse to a generic message in production.
    fn client_detail(&self) -> String {
        match self {
            Self::Pipeline(_) | Self::Internal(_) => {
                let production = std::env::var("ENVIRONMENT")
                    .map(|e| e.eq_ignore_ascii_case("production"))
                    .unwrap_or(false);
                if production {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "detail": self.client_detail() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("bad id").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::conflict("exists").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::not_found("nope").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::internal("boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
