// Worker error types

use gmatch_cache::CacheError;
use gmatch_store::StoreError;
use thiserror::Error;

pub type MatcherResult<T> = Result<T, MatcherError>;

/// Errors that abort one tick. Both kinds are transient from the worker's
/// point of view: the tick is logged and retried from a fresh snapshot at
/// the next interval.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
