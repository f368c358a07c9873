// Cache error types

use std::time::Duration;

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    /// Network or server-side failure; retried at the next tick.
    #[error("transient cache error: {0}")]
    Transient(String),

    /// The bounded I/O deadline elapsed.
    #[error("cache call exceeded {0:?}")]
    Timeout(Duration),

    /// A stored value failed to decode. Carries the offending key so the
    /// caller can log it; the entry is skipped, never marked processed.
    #[error("malformed cache value at {key}: {reason}")]
    Format { key: String, reason: String },
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Transient(err.to_string())
    }
}
