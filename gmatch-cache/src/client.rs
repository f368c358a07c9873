// Redis-backed cache adapter

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::info;

use crate::error::{CacheError, CacheResult};
use crate::ops::CacheOps;

// Compare-and-del release primitive; runs atomically server-side.
const DEL_IF_EQUAL_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Redis adapter. Every call runs under the bounded I/O deadline; an elapsed
/// deadline surfaces as `CacheError::Timeout` and is treated as transient by
/// the workers.
pub struct RedisCache {
    conn: ConnectionManager,
    io_timeout: Duration,
    del_if_equal: Script,
}

impl RedisCache {
    pub async fn connect(url: &str, io_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(io_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(io_timeout))??;
        info!(url, "connected to cache");
        Ok(Self {
            conn,
            io_timeout,
            del_if_equal: Script::new(DEL_IF_EQUAL_SCRIPT),
        })
    }

    async fn bounded<T, F>(&self, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.io_timeout))?
            .map_err(CacheError::from)
    }
}

#[async_trait]
impl CacheOps for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.get(key).await }).await
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.set(key, value).await }).await
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.del(key).await }).await
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.keys(pattern).await }).await
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        // MGET via explicit command: the typed helper collapses a single-key
        // reply into a scalar, which breaks positional alignment.
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        self.bounded(async move { cmd.query_async(&mut conn).await })
            .await
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1));
        let reply: Option<String> = self
            .bounded(async move { cmd.query_async(&mut conn).await })
            .await?;
        Ok(reply.is_some())
    }

    async fn del_if_equal(&self, key: &str, value: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let released: i64 = self
            .bounded(async move {
                let mut invocation = self.del_if_equal.prepare_invoke();
                invocation.key(key).arg(value);
                invocation.invoke_async(&mut conn).await
            })
            .await?;
        Ok(released == 1)
    }
}
