//! # Parley Service
//!
//! Business logic for the Parley chat backend: the user record store and
//! the cache wrapper with its health probes.

pub mod cache;
pub mod dto;
pub mod user_service;

pub use cache::{
    CacheBackend, CacheHealthChecker, CacheService, ConnectionStatus, DetailedStatus,
    HealthChecks, HealthState, MemoryCacheBackend, RedisCacheBackend, DEFAULT_TTL,
};
pub use dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
pub use user_service::{UserService, UserServiceImpl};
