use std::sync::Arc;

use crate::{
    db::{CacheEntry, CacheStore},
    error::AppResult,
    models::Track,
    services::{
        clock::{Clock, SystemClock},
        providers::MusicProvider,
    },
};

/// Age after which the whole cache entry is discarded
pub const CACHE_EXPIRY_SECS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// Durable tag→tracks cache in front of the provider's tag catalogue
///
/// Expiry is global: once the entry is older than [`CACHE_EXPIRY_SECS`] every
/// tag is dropped and the entry starts over, even tags fetched moments before.
/// Writes are best effort; a failed save is logged and the fetched tracks are
/// still returned.
#[derive(Clone)]
pub struct TagCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl TagCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn with_system_clock(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    /// Loads the stored entry, substituting an empty one when absent or unreadable
    async fn load_entry(&self, now: f64) -> CacheEntry {
        match self.store.load().await {
            Ok(Some(entry)) => {
                tracing::debug!(tags = entry.tags.len(), "Loaded tag cache");
                entry
            }
            Ok(None) => CacheEntry::empty(now),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backend = self.store.name(),
                    "Error loading tag cache, starting fresh"
                );
                CacheEntry::empty(now)
            }
        }
    }

    /// Returns the tracks for `tag`, fetching through `provider` on a miss
    pub async fn get_tracks_for_tag(
        &self,
        tag: &str,
        provider: &dyn MusicProvider,
        limit: u32,
        force_refresh: bool,
    ) -> Vec<Track> {
        let now = self.clock.now_epoch_secs();
        let mut entry = self.load_entry(now).await;

        let expired = entry.age(now) > CACHE_EXPIRY_SECS;
        if force_refresh || expired {
            tracing::info!(
                reason = if expired { "expired" } else { "refresh forced" },
                discarded_tags = entry.tags.len(),
                "Clearing tag cache"
            );
            entry = CacheEntry::empty(now);
        }

        if !force_refresh {
            if let Some(tracks) = entry.tags.get(tag) {
                tracing::info!(tag = %tag, tracks = tracks.len(), "Using cached tracks for tag");
                return tracks.clone();
            }
        }

        tracing::info!(tag = %tag, provider = provider.name(), "Fetching tracks for tag");
        let tracks = provider.fetch_tracks_by_tag(tag, limit).await;

        entry.tags.insert(tag.to_string(), tracks.clone());
        entry.last_updated = self.clock.now_epoch_secs();

        if let Err(e) = self.store.save(&entry).await {
            tracing::error!(
                error = %e,
                backend = self.store.name(),
                tag = %tag,
                "Error saving tag cache"
            );
        } else {
            tracing::debug!(tags = entry.tags.len(), "Saved tag cache");
        }

        tracks
    }

    /// Deletes the persisted entry; the next lookup starts from scratch
    pub async fn clear_cache(&self) -> AppResult<()> {
        self.store.clear().await.map_err(|e| {
            tracing::error!(error = %e, backend = self.store.name(), "Error clearing tag cache");
            e
        })
    }
}
