//! Unified error handling for Warden Core

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Forbidden: {0}")]
    DeleteMasterForbidden(String),

    /// Authorization code absent, already consumed, or expired.
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("An error occurs while trying to {operation}: {source}")]
    TechnicalManagement {
        operation: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Infrastructure failure, as opposed to a business-rule violation.
    pub fn is_technical(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Redis(_)
                | AppError::Internal(_)
                | AppError::TechnicalManagement { .. }
        )
    }

    /// Wrap a technical failure with the management operation it interrupted.
    ///
    /// Logical errors (not found, already exists, master protected, ...) pass
    /// through untouched so callers can still branch on them. An error that is
    /// already wrapped is not wrapped twice.
    pub fn management(operation: impl Into<String>) -> impl FnOnce(AppError) -> AppError {
        let operation = operation.into();
        move |err| match err {
            AppError::TechnicalManagement { .. } => err,
            err if err.is_technical() => {
                tracing::error!(operation = %operation, error = %err, "Management operation failed");
                AppError::TechnicalManagement {
                    operation,
                    source: Box::new(err),
                }
            }
            err => err,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::AlreadyExists(msg) => (StatusCode::CONFLICT, "already_exists", msg.clone()),
            AppError::DeleteMasterForbidden(msg) => {
                (StatusCode::FORBIDDEN, "forbidden", msg.clone())
            }
            AppError::InvalidGrant(msg) => (StatusCode::BAD_REQUEST, "invalid_grant", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "cache_error",
                    "A cache error occurred".to_string(),
                )
            }
            AppError::TechnicalManagement { operation, source } => {
                tracing::error!("Technical error while trying to {}: {:?}", operation, source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "technical_error",
                    format!("An error occurs while trying to {}", operation),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
