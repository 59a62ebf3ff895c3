//! Cache subsystem: backend abstraction, wrapper, and health probes.

mod cache_backend;
mod cache_service;
mod health;
mod memory_cache;
mod redis_cache;

pub use cache_backend::CacheBackend;
pub use cache_service::CacheService;
pub use health::{
    CacheHealthChecker, ConnectionStatus, DetailedStatus, HealthChecks, HealthState,
};
pub use memory_cache::MemoryCacheBackend;
pub use redis_cache::{RedisCacheBackend, DEFAULT_TTL};
