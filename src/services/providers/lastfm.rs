//! Last.fm API provider
//!
//! Implements the three lookups the engine needs on top of the public
//! Last.fm 2.0 API:
//! 1. Listening history: `user.gettoptracks`
//! 2. Track tags: `track.gettoptags`
//! 3. Tag catalogue: `tag.gettoptracks`
//!
//! Every call goes through a bounded retry with exponential backoff and
//! jitter. Exhausted retries are logged and reported as an empty list.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        lastfm::{tags_from_api, ApiErrorResponse, TagTracksResponse, TopTagsResponse, TopTracksResponse},
        Tag, Track,
    },
    services::providers::MusicProvider,
};

const MAX_JITTER_MS: u64 = 500;

/// Retry schedule for Last.fm calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (zero-based)
    ///
    /// `base * 2^attempt` plus a uniform jitter in `[0, max_jitter]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        backoff + jitter
    }

    /// Runs `op` until it succeeds or the attempts are exhausted
    pub async fn run<T, F, Fut>(&self, method: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::error!(
                        method = %method,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Last.fm call failed"
                    );

                    if attempt + 1 >= attempts {
                        tracing::error!(method = %method, "Max retries reached, giving up");
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    tracing::info!(
                        method = %method,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying Last.fm call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Decodes a Last.fm JSON body, surfacing in-band `{"error": ...}` replies
fn parse_response<T: DeserializeOwned>(method: &str, body: &str) -> AppResult<T> {
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(body) {
        return Err(AppError::ExternalApi(format!(
            "Last.fm {} returned error {}: {}",
            method, api_error.error, api_error.message
        )));
    }

    serde_json::from_str(body).map_err(|e| {
        tracing::error!(method = %method, error = %e, "Failed to parse Last.fm response");
        AppError::ExternalApi(format!("Unexpected response format from Last.fm {}: {}", method, e))
    })
}

#[derive(Clone)]
pub struct LastFmProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    retry: RetryPolicy,
}

impl LastFmProvider {
    pub fn new(api_key: String, api_url: String, retry: RetryPolicy) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            retry,
        }
    }

    /// Creates a provider from application configuration
    pub fn from_config(config: &Config) -> Self {
        let retry = RetryPolicy {
            max_attempts: config.lastfm_max_retries,
            base_delay: Duration::from_millis(config.lastfm_retry_base_ms),
            ..RetryPolicy::default()
        };
        Self::new(config.lastfm_api_key.clone(), config.lastfm_api_url.clone(), retry)
    }

    /// Issues one API request and decodes the body
    async fn request<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> AppResult<T> {
        tracing::debug!(method = %method, params = ?params, "Making Last.fm API request");

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("method", method),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(AppError::ExternalApi(format!(
                    "Last.fm {} returned status {} (error {}): {}",
                    method, status, api_error.error, api_error.message
                )));
            }
            return Err(AppError::ExternalApi(format!(
                "Last.fm API returned status {}: {}",
                status, body
            )));
        }

        parse_response(method, &body)
    }

    /// Issues a request with retries
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<(&str, String)>) -> AppResult<T> {
        self.retry
            .run(method, || self.request::<T>(method, &params))
            .await
    }
}

#[async_trait::async_trait]
impl MusicProvider for LastFmProvider {
    async fn fetch_top_tracks(&self, username: &str, period: &str, limit: u32) -> Vec<Track> {
        let params = vec![
            ("user", username.to_string()),
            ("period", period.to_string()),
            ("limit", limit.to_string()),
        ];

        match self.call::<TopTracksResponse>("user.gettoptracks", params).await {
            Ok(response) => {
                let tracks: Vec<Track> = response
                    .toptracks
                    .track
                    .into_vec()
                    .into_iter()
                    .map(Track::from)
                    .collect();
                tracing::info!(
                    username = %username,
                    period = %period,
                    tracks = tracks.len(),
                    provider = "lastfm",
                    "Top tracks fetched"
                );
                tracks
            }
            Err(e) => {
                tracing::error!(username = %username, error = %e, "Failed to get top tracks");
                Vec::new()
            }
        }
    }

    async fn fetch_track_tags(&self, artist: &str, name: &str, limit: u32) -> Vec<Tag> {
        let params = vec![
            ("artist", artist.to_string()),
            ("track", name.to_string()),
            ("limit", limit.to_string()),
        ];

        match self.call::<TopTagsResponse>("track.gettoptags", params).await {
            Ok(response) => tags_from_api(response.toptags.tag.into_vec(), limit as usize),
            Err(e) => {
                tracing::error!(
                    artist = %artist,
                    track = %name,
                    error = %e,
                    "Failed to get track tags"
                );
                Vec::new()
            }
        }
    }

    async fn fetch_tracks_by_tag(&self, tag: &str, limit: u32) -> Vec<Track> {
        let params = vec![("tag", tag.to_string()), ("limit", limit.to_string())];

        match self.call::<TagTracksResponse>("tag.gettoptracks", params).await {
            Ok(response) => {
                let tracks: Vec<Track> = response
                    .tracks
                    .track
                    .into_vec()
                    .into_iter()
                    .map(Track::from)
                    .collect();
                tracing::info!(tag = %tag, tracks = tracks.len(), provider = "lastfm", "Tag tracks fetched");
                tracks
            }
            Err(e) => {
                tracing::error!(tag = %tag, error = %e, "Failed to get tracks for tag");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "lastfm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::ZERO,
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_jitter_is_bounded() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay_for(0);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);

        let result = instant_policy(3)
            .run("track.gettoptags", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AppError::ExternalApi("temporary".to_string()))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = instant_policy(3)
            .run("tag.gettoptracks", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::ExternalApi("down".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_parse_response_detects_in_band_error() {
        let result = parse_response::<TopTagsResponse>(
            "track.gettoptags",
            r#"{"error": 6, "message": "Track not found"}"#,
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("error 6"));
        assert!(err.to_string().contains("Track not found"));
    }

    #[test]
    fn test_parse_response_rejects_unexpected_shape() {
        let result = parse_response::<TopTagsResponse>("track.gettoptags", r#"{"something": []}"#);
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[test]
    fn test_parse_response_success() {
        let response = parse_response::<TopTagsResponse>(
            "track.gettoptags",
            r#"{"toptags": {"tag": [{"name": "Rock", "count": 100}]}}"#,
        )
        .unwrap();

        let tags = tags_from_api(response.toptags.tag.into_vec(), 10);
        assert_eq!(tags, vec![Tag::new("rock", 100.0)]);
    }

    #[tokio::test]
    async fn test_unreachable_api_yields_empty_list() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let provider = LastFmProvider::new(
            "key".to_string(),
            "http://127.0.0.1:9/2.0/".to_string(),
            instant_policy(1),
        );

        assert!(provider.fetch_tracks_by_tag("rock", 20).await.is_empty());
        assert!(provider.fetch_track_tags("A", "X", 10).await.is_empty());
    }
}
