use redis::AsyncCommands;
use redis::Client;

use super::{CacheEntry, CacheStore};
use crate::error::AppResult;

/// Redis key holding the serialized tag cache
pub const TAG_CACHE_KEY: &str = "tagcache:tag_tracks";

/// Opens a client for `redis_url`; connections are made lazily per call
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Tag cache stored as one JSON value under [`TAG_CACHE_KEY`]
///
/// No TTL is set on the key; expiry is decided from the entry's own
/// `last_updated` so every backend ages the same way.
#[derive(Clone)]
pub struct RedisCacheStore {
    redis_client: Client,
}

impl RedisCacheStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCacheStore {
    async fn load(&self) -> AppResult<Option<CacheEntry>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(TAG_CACHE_KEY).await?;

        match cached {
            Some(json) => {
                let entry: CacheEntry = serde_json::from_str(&json)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, entry: &CacheEntry) -> AppResult<()> {
        let json = serde_json::to_string(entry)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(TAG_CACHE_KEY, json).await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(TAG_CACHE_KEY).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_create_redis_client_rejects_bad_url() {
        assert!(create_redis_client("not a url").is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_save_load_clear_round_trip() {
        let store = RedisCacheStore::new(create_redis_client(&redis_url()).unwrap());

        let mut entry = CacheEntry::empty(1_700_000_000.0);
        entry
            .tags
            .insert("dub".to_string(), vec![Track::new("King Tubby", "Dub Fi Gwan")]);

        store.save(&entry).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(entry));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
