//! Application state for Axum handlers.

use parley_service::{CacheHealthChecker, CacheService, UserService};
use std::sync::Arc;

/// Shared application state, explicitly constructed at startup.
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserService>,
    pub cache: CacheService,
    pub cache_health: CacheHealthChecker,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(user_service: Arc<dyn UserService>, cache: CacheService) -> Self {
        let cache_health = CacheHealthChecker::new(cache.clone());
        Self {
            user_service,
            cache,
            cache_health,
        }
    }
}
