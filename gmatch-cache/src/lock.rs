// Scheduler leadership lock
//
// SET NX EX with a random token; release compares the token server-side so
// only the owner can delete the key. A crashed leader's lock expires on its
// own after the TTL.

use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::error::CacheResult;
use crate::model::LOCK_KEY;
use crate::ops::CacheOps;

pub struct CycleLock {
    ttl: Duration,
}

impl CycleLock {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Try to take leadership for one cycle. `None` means another instance
    /// holds the lock; the caller skips the cycle silently.
    pub async fn acquire(&self, cache: &dyn CacheOps) -> CacheResult<Option<String>> {
        let token = Uuid::new_v4().to_string();
        if cache
            .set_if_absent_with_ttl(LOCK_KEY, &token, self.ttl)
            .await?
        {
            debug!(token = %token, "leadership lock acquired");
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    /// Release the lock if we still own it. `false` means the token no
    /// longer matched (the lock expired and may have been taken over).
    pub async fn release(&self, cache: &dyn CacheOps, token: &str) -> CacheResult<bool> {
        cache.del_if_equal(LOCK_KEY, token).await
    }
}
