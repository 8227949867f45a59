//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::DomainError;

/// Message returned for any failure the client cannot act on
pub const INTERNAL_ERROR_DETAIL: &str = "Internal server error";

/// Error body: `{"detail": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub detail: String,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                detail: detail.into(),
            },
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, detail)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_DETAIL)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::VectorStoreNotFound { message } => Self::unavailable(message),
            DomainError::Validation { message } => Self::bad_request(message),
            other => {
                error!(error = %other, "Request failed");
                Self::internal()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.response.detail)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_vector_store_is_unavailable() {
        let err = ApiError::from(DomainError::vector_store_not_found("vector_store"));
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.response.detail.starts_with("Vector store not found at vector_store."));
    }

    #[test]
    fn test_other_errors_are_generic() {
        let err = ApiError::from(DomainError::provider("openai", "HTTP 401: bad key"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.response.detail, "Internal server error");
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err = ApiError::from(DomainError::validation("Question cannot be empty"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "400 Bad Request: Question cannot be empty");
    }

    #[test]
    fn test_body_shape() {
        let json = serde_json::to_value(ApiError::bad_request("nope").response).unwrap();
        assert_eq!(json, serde_json::json!({ "detail": "nope" }));
    }
}
