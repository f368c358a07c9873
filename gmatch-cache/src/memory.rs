// In-memory cache backend
//
// Same observable semantics as the Redis adapter, including TTL expiry for
// the leadership lock. Used by the worker tests and local single-process
// runs; not safe across processes.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{CacheError, CacheResult};
use crate::ops::CacheOps;

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at > now).unwrap_or(true)
    }
}

#[derive(Default)]
pub struct MemoryCache {
    slots: Mutex<BTreeMap<String, Slot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, BTreeMap<String, Slot>>> {
        self.slots
            .lock()
            .map_err(|_| CacheError::Transient("memory cache poisoned".to_string()))
    }
}

/// Glob matching restricted to the forms the matcher uses: a literal key or
/// a `prefix:*` enumeration pattern.
fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl CacheOps for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let mut slots = self.lock()?;
        match slots.get(key) {
            Some(slot) if slot.live(now) => Ok(Some(slot.value.clone())),
            Some(_) => {
                slots.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.lock()?.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let now = Instant::now();
        let mut slots = self.lock()?;
        slots.retain(|_, slot| slot.live(now));
        Ok(slots
            .keys()
            .filter(|k| pattern_matches(pattern, k))
            .cloned()
            .collect())
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        let now = Instant::now();
        let slots = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| {
                slots
                    .get(key)
                    .filter(|slot| slot.live(now))
                    .map(|slot| slot.value.clone())
            })
            .collect())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let now = Instant::now();
        let mut slots = self.lock()?;
        if slots.get(key).map(|slot| slot.live(now)).unwrap_or(false) {
            return Ok(false);
        }
        slots.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn del_if_equal(&self, key: &str, value: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let mut slots = self.lock()?;
        let held = slots
            .get(key)
            .filter(|slot| slot.live(now))
            .map(|slot| slot.value == value)
            .unwrap_or(false);
        if held {
            slots.remove(key);
        }
        Ok(held)
    }
}
