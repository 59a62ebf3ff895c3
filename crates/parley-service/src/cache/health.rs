//! Cache health probes.

use super::CacheService;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const HEALTH_CHECK_KEY: &str = "health_check";
const HEALTH_CHECK_VALUE: &str = "ok";
const DETAILED_HEALTH_CHECK_KEY: &str = "detailed_health_check";

/// Outcome of a timed connectivity probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Overall health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Individual sub-checks of a detailed probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub connection: bool,
    pub read_write: bool,
    pub response_time_ms: u64,
}

/// Result of a detailed write/read/delete round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedStatus {
    pub status: HealthState,
    pub timestamp: String,
    pub checks: HealthChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Periodic self-test against the cache wrapper.
#[derive(Clone, Debug)]
pub struct CacheHealthChecker {
    cache: CacheService,
}

impl CacheHealthChecker {
    /// Creates a new health checker over the given cache service.
    #[must_use]
    pub fn new(cache: CacheService) -> Self {
        Self { cache }
    }

    /// Writes a sentinel value, reads it back, deletes it, and reports
    /// whether all three steps succeeded with a matching read-back. Any
    /// backend failure surfaces as `false`, never as an error.
    pub async fn is_healthy(&self) -> bool {
        let stored = self
            .cache
            .set(HEALTH_CHECK_KEY, &HEALTH_CHECK_VALUE, Some(10))
            .await;
        let result: Option<String> = self.cache.get(HEALTH_CHECK_KEY).await;
        let deleted = self.cache.del(HEALTH_CHECK_KEY).await;

        stored && deleted && result.as_deref() == Some(HEALTH_CHECK_VALUE)
    }

    /// Times [`is_healthy`](Self::is_healthy).
    pub async fn connection_status(&self) -> ConnectionStatus {
        let start = Instant::now();
        let healthy = self.is_healthy().await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        ConnectionStatus {
            is_connected: healthy,
            response_time_ms: Some(response_time_ms),
            error: None,
        }
    }

    /// Performs a write/read/delete round-trip with a structured payload
    /// and compares serialized equality.
    pub async fn detailed_status(&self) -> DetailedStatus {
        let timestamp = Utc::now().to_rfc3339();
        let start = Instant::now();

        let payload = serde_json::json!({
            "test": true,
            "timestamp": timestamp,
        });

        let _ = self
            .cache
            .set(DETAILED_HEALTH_CHECK_KEY, &payload, Some(30))
            .await;
        let result: Option<serde_json::Value> = self.cache.get(DETAILED_HEALTH_CHECK_KEY).await;
        let _ = self.cache.del(DETAILED_HEALTH_CHECK_KEY).await;

        let response_time_ms = start.elapsed().as_millis() as u64;
        let read_write = result.as_ref() == Some(&payload);

        DetailedStatus {
            status: if read_write {
                HealthState::Healthy
            } else {
                HealthState::Unhealthy
            },
            timestamp,
            checks: HealthChecks {
                connection: result.is_some(),
                read_write,
                response_time_ms,
            },
            error: if read_write {
                None
            } else {
                Some("Cache read/write round-trip failed".to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, MemoryCacheBackend};
    use async_trait::async_trait;
    use parley_core::{ParleyError, ParleyResult};
    use std::sync::Arc;
    use std::time::Duration;

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

    /// Backend that accepts writes but loses them.
    struct LossyBackend;

    #[async_trait]
    impl CacheBackend for LossyBackend {
        async fn get_raw(&self, _key: &str) -> ParleyResult<Option<String>> {
            Ok(None)
        }

        async fn set_raw(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> ParleyResult<()> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> ParleyResult<()> {
            Ok(())
        }

        async fn clear(&self) -> ParleyResult<()> {
            Ok(())
        }
    }

    fn checker(backend: Arc<dyn CacheBackend>) -> CacheHealthChecker {
        CacheHealthChecker::new(CacheService::new(backend))
    }

    #[tokio::test]
    async fn test_is_healthy_with_working_backend() {
        let checker = checker(Arc::new(MemoryCacheBackend::new()));
        assert!(checker.is_healthy().await);
    }

    #[tokio::test]
    async fn test_is_healthy_with_failing_backend() {
        let checker = checker(Arc::new(FailingBackend));
        assert!(!checker.is_healthy().await);
    }

    #[tokio::test]
    async fn test_is_healthy_when_writes_are_lost() {
        let checker = checker(Arc::new(LossyBackend));
        assert!(!checker.is_healthy().await);
    }

    #[tokio::test]
    async fn test_is_healthy_when_only_delete_fails() {
        struct DeleteFailingBackend(MemoryCacheBackend);

        #[async_trait]
        impl CacheBackend for DeleteFailingBackend {
            async fn get_raw(&self, key: &str) -> ParleyResult<Option<String>> {
                self.0.get_raw(key).await
            }

            async fn set_raw(
                &self,
                key: &str,
                value: &str,
                ttl: Option<Duration>,
            ) -> ParleyResult<()> {
                self.0.set_raw(key, value, ttl).await
            }

            async fn delete(&self, _key: &str) -> ParleyResult<()> {
                Err(ParleyError::Cache("delete refused".to_string()))
            }

            async fn clear(&self) -> ParleyResult<()> {
                self.0.clear().await
            }
        }

        let checker = checker(Arc::new(DeleteFailingBackend(MemoryCacheBackend::new())));
        assert!(!checker.is_healthy().await);
    }

    #[tokio::test]
    async fn test_is_healthy_cleans_up_sentinel() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let checker = checker(backend.clone());
        assert!(checker.is_healthy().await);
        assert_eq!(backend.get_raw(HEALTH_CHECK_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connection_status_reports_time() {
        let checker = checker(Arc::new(MemoryCacheBackend::new()));
        let status = checker.connection_status().await;
        assert!(status.is_connected);
        assert!(status.response_time_ms.is_some());
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_connection_status_with_failing_backend() {
        let checker = checker(Arc::new(FailingBackend));
        let status = checker.connection_status().await;
        assert!(!status.is_connected);
    }

    #[tokio::test]
    async fn test_detailed_status_healthy() {
        let checker = checker(Arc::new(MemoryCacheBackend::new()));
        let status = checker.detailed_status().await;
        assert_eq!(status.status, HealthState::Healthy);
        assert!(status.checks.connection);
        assert!(status.checks.read_write);
        assert!(status.error.is_none());
        assert!(!status.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_detailed_status_unhealthy() {
        let checker = checker(Arc::new(FailingBackend));
        let status = checker.detailed_status().await;
        assert_eq!(status.status, HealthState::Unhealthy);
        assert!(!status.checks.connection);
        assert!(!status.checks.read_write);
        assert!(status.error.is_some());
    }

    #[test]
    fn test_health_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HealthState::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthState::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }
}
