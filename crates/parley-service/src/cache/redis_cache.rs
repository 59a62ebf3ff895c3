//! Redis-based cache backend.

use super::CacheBackend;
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Pool};
use parley_core::{ParleyError, ParleyResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default TTL for cached items (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Redis-based cache backend.
pub struct RedisCacheBackend {
    /// Redis connection pool.
    pool: Arc<Pool>,
    /// TTL applied when the caller does not provide one.
    default_ttl: Duration,
}

impl RedisCacheBackend {
    /// Creates a new Redis cache backend.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self {
            pool,
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Creates a Redis cache backend with a custom default TTL.
    #[must_use]
    pub fn with_ttl(pool: Arc<Pool>, default_ttl: Duration) -> Self {
        Self { pool, default_ttl }
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> ParleyResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| ParleyError::Cache(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get_raw(&self, key: &str) -> ParleyResult<Option<String>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| ParleyError::Cache(format!("Failed to get key '{}': {}", key, e)))?;

        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> ParleyResult<()> {
        let mut conn = self.get_conn().await?;
        let ttl_secs = ttl.unwrap_or(self.default_ttl).as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| ParleyError::Cache(format!("Failed to set key '{}': {}", key, e)))?;

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ParleyResult<()> {
        let mut conn = self.get_conn().await?;
        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| ParleyError::Cache(format!("Failed to delete key '{}': {}", key, e)))?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(())
    }

    async fn clear(&self) -> ParleyResult<()> {
        let mut conn = self.get_conn().await?;
        let _: () = deadpool_redis::redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(|e| ParleyError::Cache(format!("Failed to clear cache: {}", e)))?;

        debug!("Cache namespace cleared");
        Ok(())
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
