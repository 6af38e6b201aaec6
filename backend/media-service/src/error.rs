/// Error types for media-service
///
/// Remote failures are surfaced as they are; nothing here retries. Errors are
/// converted to JSON HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for media-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transient failure of a remote store that is not Postgres-backed
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Cache error: {0}")]
    Cache(#[from] flourish_cache::CacheError),

    #[error("Notification error: {0}")]
    Notification(#[from] cache_invalidation::InvalidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a later identical request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Unavailable(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Cache(_)
            | AppError::Notification(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Keep driver details out of client responses
        let error_msg = match self {
            AppError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
            "retryable": self.is_transient(),
        }))
    }
}
