//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion. The gateway is the only
//! place where an error kind becomes a status code and body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::infra::StoreError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Schema errors
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // Routing
    #[error("No resource matches {0}")]
    UnsupportedOperation(String),

    #[error("Method {method} not supported on {path}")]
    MethodNotAllowed { method: String, path: String },

    // External service errors
    #[error("Document store unavailable")]
    StoreUnavailable(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error kind
    #[schema(example = "NotFound")]
    pub error: String,
    /// Human readable description
    #[schema(example = "Resource not found")]
    pub message: String,
}

impl AppError {
    /// Get error kind for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownEntityType(_) => "UnknownEntityType",
            AppError::NotFound => "NotFound",
            AppError::Validation(_) => "ValidationError",
            AppError::MalformedRequest(_) => "MalformedRequest",
            AppError::UnsupportedOperation(_) | AppError::MethodNotAllowed { .. } => {
                "UnsupportedOperation"
            }
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::Internal(_) => "InternalError",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownEntityType(_)
            | AppError::NotFound
            | AppError::UnsupportedOperation(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Validation(_) | AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),

            AppError::StoreUnavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                "The document store is unavailable, try again later".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateId { collection, id } => {
                AppError::Validation(format!("{}/{} already exists", collection, id))
            }
            StoreError::Constraint(msg) => AppError::Validation(msg),
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Timeout(after) => {
                AppError::StoreUnavailable(format!("timed out after {:?}", after))
            }
            StoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization error: {}", err))
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        AppError::MalformedRequest(msg.into())
    }

    pub fn unsupported(path: impl Into<String>) -> Self {
        AppError::UnsupportedOperation(path.into())
    }

    pub fn method_not_allowed(method: impl ToString, path: impl Into<String>) -> Self {
        AppError::MethodNotAllowed {
            method: method.to_string(),
            path: path.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes_follow_error_kind() {
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::malformed("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unsupported("/x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::method_not_allowed("POST", "/x/1").status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AppError::StoreUnavailable("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::UnknownEntityType("Ghost".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_both_routing_failures_share_a_kind() {
        assert_eq!(AppError::unsupported("/x").code(), "UnsupportedOperation");
        assert_eq!(
            AppError::method_not_allowed("PUT", "/x").code(),
            "UnsupportedOperation"
        );
    }

    #[test]
    fn test_store_errors_translate_to_domain_kinds() {
        let dup: AppError = StoreError::DuplicateId {
            collection: "widgets".into(),
            id: "1".into(),
        }
        .into();
        assert!(matches!(dup, AppError::Validation(_)));

        let timeout: AppError = StoreError::Timeout(Duration::from_millis(10)).into();
        assert!(matches!(timeout, AppError::StoreUnavailable(_)));

        let down: AppError = StoreError::Unavailable("refused".into()).into();
        assert_eq!(down.code(), "StoreUnavailable");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::internal("secret stack trace");
        assert_eq!(err.user_message(), "An internal error occurred");
    }
}
