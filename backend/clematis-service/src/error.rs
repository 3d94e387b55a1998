/// Error types for clematis-service
///
/// Every failure surfaced to a client is rendered as the standard envelope
/// `{code, data, success, error}` with a stable numeric code. Storage and
/// internal details are logged here and never rendered.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::models::ApiResponse;

/// Result type for clematis-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Postgres SQLSTATE codes that are safe to retry.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const QUERY_CANCELED: &str = "57014";

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, unknown, or client-mismatched session
    #[error("Authenticate first")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded payload failed content sniffing
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage timeout or connection failure; safe to retry
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable client-facing error code
    pub fn code(&self) -> u16 {
        match self {
            AppError::Unauthenticated => 103,
            AppError::NotFound(_) => 900,
            AppError::InvalidInput(_) => 105,
            AppError::InvalidUpload(_) => 104,
            AppError::Conflict(_) => 101,
            AppError::Transient(_) | AppError::Internal(_) => 420,
        }
    }

    /// Message rendered to the client
    pub fn public_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "Authenticate first".to_string(),
            AppError::NotFound(_) => "That record doesn't exist.".to_string(),
            AppError::InvalidInput(_) => "Invalid input data.".to_string(),
            AppError::InvalidUpload(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::Transient(_) | AppError::Internal(_) => {
                "Please try again later.".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Transient(detail) => tracing::warn!(error = %detail, "transient failure"),
            AppError::Internal(detail) => tracing::error!(error = %detail, "internal failure"),
            _ => {}
        }

        HttpResponse::build(self.status_code())
            .json(ApiResponse::failure(self.code(), self.public_message()))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => AppError::Transient(err.to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(QUERY_CANCELED) => {
                    AppError::Transient(err.to_string())
                }
                _ => AppError::Internal(err.to_string()),
            },
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Transient(format!("storage deadline exceeded: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
