//! In-memory cache backend.
//!
//! Used when no Redis backend is configured, and by tests. Honors a
//! maximum entry count; the oldest insertion is evicted first.

use super::CacheBackend;
use async_trait::async_trait;
use parley_core::ParleyResult;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::redis_cache::DEFAULT_TTL;

struct Entry {
    value: String,
    expires_at: Instant,
}

struct Store {
    entries: HashMap<String, Entry>,
    insertion_order: VecDeque<String>,
}

/// Bounded in-memory cache backend with per-entry expiry.
pub struct MemoryCacheBackend {
    store: Mutex<Store>,
    max_items: usize,
    default_ttl: Duration,
}

impl MemoryCacheBackend {
    /// Creates a backend with the default TTL and a 100-entry bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, 100)
    }

    /// Creates a backend with explicit TTL and capacity bounds.
    #[must_use]
    pub fn with_limits(default_ttl: Duration, max_items: usize) -> Self {
        Self {
            store: Mutex::new(Store {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            max_items: max_items.max(1),
            default_ttl,
        }
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get_raw(&self, key: &str) -> ParleyResult<Option<String>> {
        let mut store = self.store.lock().expect("cache store poisoned");

        let expired = match store.entries.get(key) {
            Some(entry) if entry.expires_at <= Instant::now() => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
            None => return Ok(None),
        };

        if expired {
            store.entries.remove(key);
            store.insertion_order.retain(|k| k != key);
        }
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> ParleyResult<()> {
        let mut store = self.store.lock().expect("cache store poisoned");

        if store.entries.contains_key(key) {
            store.insertion_order.retain(|k| k != key);
        } else if store.entries.len() >= self.max_items {
            if let Some(evicted) = store.insertion_order.pop_front() {
                store.entries.remove(&evicted);
            }
        }

        store.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl.unwrap_or(self.default_ttl),
            },
        );
        store.insertion_order.push_back(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> ParleyResult<()> {
        let mut store = self.store.lock().expect("cache store poisoned");
        store.entries.remove(key);
        store.insertion_order.retain(|k| k != key);
        Ok(())
    }

    async fn clear(&self) -> ParleyResult<()> {
        let mut store = self.store.lock().expect("cache store poisoned");
        store.entries.clear();
        store.insertion_order.clear();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheBackend")
            .field("max_items", &self.max_items)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
