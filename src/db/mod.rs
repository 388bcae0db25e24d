use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{CacheBackend, Config};
use crate::error::AppResult;
use crate::models::Track;

pub mod file;
pub mod memory;
pub mod redis_store;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;
pub use redis_store::{create_redis_client, RedisCacheStore};

/// Persisted tag→tracks cache
///
/// Freshness is tracked once for the whole entry. A stale entry is replaced
/// wholesale, never merged tag by tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Epoch seconds of the last write
    #[serde(default)]
    pub last_updated: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<Track>>,
}

impl CacheEntry {
    /// Creates an empty entry stamped with `now` (epoch seconds)
    pub fn empty(now: f64) -> Self {
        Self {
            last_updated: now,
            tags: BTreeMap::new(),
        }
    }

    /// Seconds elapsed since the last write
    pub fn age(&self, now: f64) -> f64 {
        now - self.last_updated
    }
}

/// Storage for the single tag cache record
///
/// Implementations replace the full record on every save. There is no
/// locking: concurrent writers may lose each other's updates.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Loads the record, `None` when nothing has been stored yet
    ///
    /// A record that exists but cannot be decoded is an error; callers treat
    /// it the same as an absent record.
    async fn load(&self) -> AppResult<Option<CacheEntry>>;

    /// Replaces the stored record
    async fn save(&self, entry: &CacheEntry) -> AppResult<()>;

    /// Deletes the stored record, succeeding if none exists
    async fn clear(&self) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Builds the cache store selected by configuration
pub fn create_cache_store(config: &Config) -> anyhow::Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::File => Arc::new(FileCacheStore::new(config.cache_path.clone())),
        CacheBackend::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            Arc::new(RedisCacheStore::new(client))
        }
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
    };

    tracing::info!(backend = store.name(), "Tag cache store initialized");

    Ok(store)
}
