// Cache adapter interface
//
// The matcher workers only ever talk to the cache through this trait, so
// tests and local runs can substitute the in-memory backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

#[async_trait]
pub trait CacheOps: Send + Sync {
    /// Fetch a value; `None` when the key is absent.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Unconditionally write a value.
    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> CacheResult<()>;

    /// Enumerate keys matching a glob pattern. Queue sizes are O(10^4), so
    /// full enumeration per tick is acceptable.
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Batched read; the result is positionally aligned with `keys` and a
    /// vanished key yields `None`.
    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>>;

    /// `SET key value NX EX ttl`; returns whether the key was set.
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool>;

    /// Atomically delete `key` only if it currently holds `value`; returns
    /// whether a deletion happened.
    async fn del_if_equal(&self, key: &str, value: &str) -> CacheResult<bool>;
}
