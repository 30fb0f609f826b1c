use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Price text that could not be reduced to a numeric value
    #[error("Unparsable price: {0:?}")]
    UnparsablePrice(String),

    /// Underlying storage unavailable or a write was rejected
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Archive write failed after the primary write already succeeded
    #[error("Archival error: {0}")]
    Archival(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error means the observation should be skipped, not retried
    pub fn is_unparsable_price(&self) -> bool {
        matches!(self, AppError::UnparsablePrice(_))
    }
}
