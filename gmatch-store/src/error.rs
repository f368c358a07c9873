// Store error types

use std::time::Duration;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or statement failure; the cycle is skipped and retried at
    /// the next tick.
    #[error("transient database error: {0}")]
    Transient(String),

    /// The bounded I/O deadline elapsed.
    #[error("database call exceeded {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Transient(err.to_string())
    }
}
