//! [`CacheProvider`] over Redis.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use unifile_core::error::{AppError, ErrorKind};
use unifile_core::result::AppResult;
use unifile_core::traits::cache::CacheProvider;

use super::client::RedisClient;

/// `SCAN` page size and keys per `DEL` while clearing a pattern.
const DELETE_BATCH: usize = 500;

/// Redis-backed cache provider.
///
/// Pattern deletion walks the keyspace with `SCAN`, so clearing a module's
/// listings never blocks the server the way `KEYS` would.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
}

impl RedisCacheProvider {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    async fn matching_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let mut conn = self.client.handle();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(DELETE_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(cache_error)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once.
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

fn cache_error(e: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.handle();
        let value: Option<String> = conn
            .get(self.client.namespaced(key))
            .await
            .map_err(cache_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.client.handle();
        // PSETEX rejects a zero expiry.
        let millis = (ttl.as_millis() as u64).max(1);
        let _: () = conn
            .pset_ex(self.client.namespaced(key), value, millis)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.client.handle();
        let _: () = conn
            .del(self.client.namespaced(key))
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.client.handle();
        let found: bool = conn
            .exists(self.client.namespaced(key))
            .await
            .map_err(cache_error)?;
        Ok(found)
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let keys = self.matching_keys(&self.client.namespaced(pattern)).await?;
        let mut conn = self.client.handle();
        let mut removed = 0u64;
        for batch in keys.chunks(DELETE_BATCH) {
            let count: u64 = conn.del(batch).await.map_err(cache_error)?;
            removed += count;
        }
        if let Some(first) = keys.first() {
            debug!(pattern, removed, sample = self.client.local_key(first), "Cleared cache keys");
        }
        Ok(removed)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.handle();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(pong == "PONG")
    }

    async fn flush_all(&self) -> AppResult<()> {
        // Only this engine's keys, never the whole database.
        self.delete_pattern(&format!("{}:*", crate::keys::PREFIX))
            .await
            .map(|_| ())
    }
}
