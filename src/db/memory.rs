use tokio::sync::RwLock;

use super::{CacheEntry, CacheStore};
use crate::error::AppResult;

/// In-process tag cache, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entry: RwLock<Option<CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `entry`
    pub fn with_entry(entry: CacheEntry) -> Self {
        Self {
            entry: RwLock::new(Some(entry)),
        }
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self) -> AppResult<Option<CacheEntry>> {
        Ok(self.entry.read().await.clone())
    }

    async fn save(&self, entry: &CacheEntry) -> AppResult<()> {
        *self.entry.write().await = Some(entry.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.entry.write().await = None;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = MemoryCacheStore::new();
        assert_eq!(store.load().await.unwrap(), None);

        let entry = CacheEntry::empty(42.0);
        store.save(&entry).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(entry));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
