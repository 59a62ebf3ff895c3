//! Cache backend trait for abstracted storage operations.

use async_trait::async_trait;
use parley_core::ParleyResult;
use std::time::Duration;

/// Storage operations a cache backend must provide.
///
/// Values are JSON strings for type-erased storage to maintain
/// dyn-compatibility; the typed surface lives on
/// [`CacheService`](crate::cache::CacheService).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a raw JSON value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get_raw(&self, key: &str) -> ParleyResult<Option<String>>;

    /// Set a raw JSON value. `None` TTL applies the backend's default.
    async fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> ParleyResult<()>;

    /// Delete a value from the cache.
    async fn delete(&self, key: &str) -> ParleyResult<()>;

    /// Clear the entire cache namespace.
    async fn clear(&self) -> ParleyResult<()>;
}
