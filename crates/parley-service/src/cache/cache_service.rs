//! Typed, non-throwing cache wrapper.

use super::CacheBackend;
use parley_core::ParleyResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Delimiter used by [`CacheService::generate_key`].
const KEY_DELIMITER: &str = ":";

/// Cache wrapper over a [`CacheBackend`].
///
/// Every operation except [`wrap`](Self::wrap) is non-throwing: backend
/// failures are logged and degrade to an absent result or a no-op, so a
/// cache outage never fails a request.
#[derive(Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl CacheService {
    /// Creates a new cache service over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Gets a typed value. Returns `None` on miss, expiry, backend
    /// failure, or a value that no longer deserializes.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get_raw(key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => {
                    debug!("Cache hit for key: {}", key);
                    Some(value)
                }
                Err(e) => {
                    error!("Cache deserialize error for key {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss for key: {}", key);
                None
            }
            Err(e) => {
                error!("Cache get error for key {}: {}", key, e);
                None
            }
        }
    }

    /// Stores a typed value with an optional TTL in seconds. Backend
    /// failures are logged and swallowed; the returned flag reports
    /// whether the value was actually stored.
    pub async fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!("Cache serialize error for key {}: {}", key, e);
                return false;
            }
        };

        let ttl = ttl_secs.map(Duration::from_secs);
        match self.backend.set_raw(key, &json, ttl).await {
            Ok(()) => {
                debug!("Cache set for key: {}", key);
                true
            }
            Err(e) => {
                error!("Cache set error for key {}: {}", key, e);
                false
            }
        }
    }

    /// Removes an entry. Backend failures are logged and swallowed; the
    /// returned flag reports whether the backend accepted the delete.
    pub async fn del(&self, key: &str) -> bool {
        match self.backend.delete(key).await {
            Ok(()) => {
                debug!("Cache deleted for key: {}", key);
                true
            }
            Err(e) => {
                error!("Cache delete error for key {}: {}", key, e);
                false
            }
        }
    }

    /// Clears the entire cache namespace. Backend failures are logged
    /// and swallowed.
    pub async fn reset(&self) {
        match self.backend.clear().await {
            Ok(()) => info!("Cache cleared"),
            Err(e) => error!("Cache reset error: {}", e),
        }
    }

    /// Returns the cached value for `key`, or invokes `compute`, stores
    /// its result, and returns it.
    ///
    /// If the backend fails at any step this degrades to invoking
    /// `compute` directly and returning its result without caching, so
    /// callers always get a value as long as `compute` succeeds. Errors
    /// from `compute` itself propagate. Best effort only: concurrent
    /// callers on a cold key may all invoke `compute`.
    pub async fn wrap<T, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl_secs: Option<u64>,
    ) -> ParleyResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ParleyResult<T>> + Send,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        let _ = self.set(key, &value, ttl_secs).await;
        Ok(value)
    }

    /// Deterministic key construction: joins `prefix` and all non-empty
    /// `parts` with `:`, dropping empty segments.
    #[must_use]
    pub fn generate_key(prefix: &str, parts: &[&str]) -> String {
        std::iter::once(prefix)
            .chain(parts.iter().copied())
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(KEY_DELIMITER)
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheBackend;
    use async_trait::async_trait;
    use parley_core::ParleyError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that fails every operation, for degradation tests.
    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get_raw(&self, _key: &str) -> ParleyResult<Option<String>> {
            Err(ParleyError::Cache("backend down".to_string()))
        }

        async fn set_raw(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> ParleyResult<()> {
            Err(ParleyError::Cache("backend down".to_string()))
        }

        async fn delete(&self, _key: &str) -> ParleyResult<()> {
            Err(ParleyError::Cache("backend down".to_string()))
        }

        async fn clear(&self) -> ParleyResult<()> {
            Err(ParleyError::Cache("backend down".to_string()))
        }
    }

    fn memory_cache() -> CacheService {
        CacheService::new(Arc::new(MemoryCacheBackend::new()))
    }

    fn failing_cache() -> CacheService {
        CacheService::new(Arc::new(FailingBackend))
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let cache = memory_cache();
        cache.set("greeting", &"hello".to_string(), Some(60)).await;

        let value: Option<String> = cache.get("greeting").await;
        assert_eq!(value, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_get_after_del_is_absent() {
        let cache = memory_cache();
        cache.set("k", &42u64, Some(60)).await;
        cache.del("k").await;

        let value: Option<u64> = cache.get("k").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_reset_clears_all_keys() {
        let cache = memory_cache();
        cache.set("a", &1u64, None).await;
        cache.set("b", &2u64, None).await;
        cache.reset().await;

        assert_eq!(cache.get::<u64>("a").await, None);
        assert_eq!(cache.get::<u64>("b").await, None);
    }

    #[tokio::test]
    async fn test_get_swallows_backend_failure() {
        let cache = failing_cache();
        let value: Option<String> = cache.get("k").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_and_del_swallow_backend_failure() {
        let cache = failing_cache();
        assert!(!cache.set("k", &"v".to_string(), Some(10)).await);
        assert!(!cache.del("k").await);
        cache.reset().await;
    }

    #[tokio::test]
    async fn test_set_and_del_report_success() {
        let cache = memory_cache();
        assert!(cache.set("k", &"v".to_string(), Some(10)).await);
        assert!(cache.del("k").await);
    }

    #[tokio::test]
    async fn test_wrap_computes_and_caches_on_miss() {
        let cache = memory_cache();
        let calls = AtomicUsize::new(0);

        let value = cache
            .wrap(
                "expensive",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("computed".to_string())
                },
                Some(60),
            )
            .await
            .unwrap();

        assert_eq!(value, "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.get::<String>("expensive").await,
            Some("computed".to_string())
        );
    }

    #[tokio::test]
    async fn test_wrap_cache_hit_short_circuits_compute() {
        let cache = memory_cache();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .wrap(
                    "once",
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok("value".to_string())
                    },
                    Some(60),
                )
                .await
                .unwrap();
            assert_eq!(value, "value");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrap_falls_back_to_compute_on_backend_failure() {
        let cache = failing_cache();
        let calls = AtomicUsize::new(0);

        let value = cache
            .wrap(
                "k",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7u64)
                },
                Some(60),
            )
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrap_propagates_compute_error() {
        let cache = memory_cache();

        let result: ParleyResult<String> = cache
            .wrap(
                "k",
                || async { Err(ParleyError::internal("compute failed")) },
                None,
            )
            .await;

        assert!(result.is_err());
        // A failed compute must not poison the cache.
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[test]
    fn test_generate_key_drops_empty_segments() {
        assert_eq!(CacheService::generate_key("a", &["b", "", "c"]), "a:b:c");
    }

    #[test]
    fn test_generate_key_prefix_only() {
        assert_eq!(CacheService::generate_key("users", &[]), "users");
    }

    #[test]
    fn test_generate_key_empty_prefix() {
        assert_eq!(CacheService::generate_key("", &["b", "c"]), "b:c");
    }
}
