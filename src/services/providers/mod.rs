//! Music metadata provider abstraction
//!
//! The recommendation engine only needs three lookups from the outside world:
//! a listener's top tracks, a track's weighted tags, and the top tracks for a
//! tag. Providers own their transport, retry and parsing concerns.

use crate::models::{Tag, Track};

pub mod lastfm;

pub use lastfm::LastFmProvider;

/// Trait for music metadata providers
///
/// Every operation returns an empty list when the provider is unavailable or
/// the lookup fails after the provider's own retries. Failures are logged by
/// the provider and never surface as errors to the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MusicProvider: Send + Sync {
    /// Most played tracks for a user over `period` (e.g. `1month`, `overall`)
    async fn fetch_top_tracks(&self, username: &str, period: &str, limit: u32) -> Vec<Track>;

    /// Weighted tags for a track, heaviest first
    async fn fetch_track_tags(&self, artist: &str, name: &str, limit: u32) -> Vec<Tag>;

    /// Top tracks carrying a tag
    async fn fetch_tracks_by_tag(&self, tag: &str, limit: u32) -> Vec<Track>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
