use std::path::PathBuf;

use serde::Deserialize;

/// Where the tag→tracks cache entry is persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// JSON file at `cache_path`
    File,
    /// Single key in Redis at `redis_url`
    Redis,
    /// Process memory only, lost on restart
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Last.fm API key
    pub lastfm_api_key: String,

    /// Last.fm API base URL
    #[serde(default = "default_lastfm_api_url")]
    pub lastfm_api_url: String,

    /// Attempts per Last.fm call before giving up
    #[serde(default = "default_lastfm_max_retries")]
    pub lastfm_max_retries: u32,

    /// Base backoff delay between Last.fm attempts, in milliseconds
    #[serde(default = "default_lastfm_retry_base_ms")]
    pub lastfm_retry_base_ms: u64,

    /// Tag cache storage backend
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    /// Tag cache file location (file backend)
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Redis connection URL (redis backend)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Listening-history window passed to `user.gettoptracks`
    #[serde(default = "default_top_tracks_period")]
    pub top_tracks_period: String,

    /// Number of top tracks used as listening history
    #[serde(default = "default_top_tracks_limit")]
    pub top_tracks_limit: u32,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_lastfm_api_url() -> String {
    "http://ws.audioscrobbler.com/2.0/".to_string()
}

fn default_lastfm_max_retries() -> u32 {
    3
}

fn default_lastfm_retry_base_ms() -> u64 {
    1000
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::File
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("cache").join("tag_tracks_cache.json")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_top_tracks_period() -> String {
    "1month".to_string()
}

fn default_top_tracks_limit() -> u32 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
