use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::{
    models::{PublicTrack, Recommendations, Track},
    services::{
        providers::MusicProvider,
        tag_cache::TagCache,
        tagger::{top_tags, Tagger},
    },
};

pub const NO_RECOMMENDATIONS: &str = "Could not generate any recommendations.";

/// Size limits for tag-popularity recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackSettings {
    pub num_tags: usize,
    pub tracks_per_tag: u32,
    pub max_results: usize,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            num_tags: 15,
            tracks_per_tag: 30,
            max_results: 20,
        }
    }
}

/// Recommends popular tracks from the listener's favourite tags
///
/// Used whenever the similarity path cannot produce anything.
pub struct FallbackRecommender {
    provider: Arc<dyn MusicProvider>,
    tag_cache: TagCache,
    settings: FallbackSettings,
}

impl FallbackRecommender {
    pub fn new(provider: Arc<dyn MusicProvider>, tag_cache: TagCache, settings: FallbackSettings) -> Self {
        Self {
            provider,
            tag_cache,
            settings,
        }
    }

    /// Unknown tracks for the listener's heaviest tags, shuffled
    pub async fn candidates(&self, tagger: &mut Tagger<'_>, known: &[Track]) -> Vec<Track> {
        let tags = top_tags(tagger, known, self.settings.num_tags).await;
        tracing::info!(tags = ?tags, "Top tags for fallback recommendations");

        let mut seen: HashSet<_> = known.iter().map(Track::key).collect();
        let mut picks = Vec::new();
        for tag in &tags {
            let tracks = self
                .tag_cache
                .get_tracks_for_tag(tag, self.provider.as_ref(), self.settings.tracks_per_tag, false)
                .await;
            picks.extend(tracks.into_iter().filter(|track| seen.insert(track.key())));
        }

        picks.shuffle(&mut rand::rng());
        picks.truncate(self.settings.max_results);
        picks
    }

    /// Fallback recommendations carrying `message`
    ///
    /// When nothing can be recommended the message is replaced with
    /// [`NO_RECOMMENDATIONS`].
    pub async fn recommend(&self, tagger: &mut Tagger<'_>, known: &[Track], message: &str) -> Recommendations {
        let tracks = self.candidates(tagger, known).await;

        if tracks.is_empty() {
            tracing::warn!("Fallback produced no recommendations");
            return Recommendations {
                tracks: Vec::new(),
                message: Some(NO_RECOMMENDATIONS.to_string()),
            };
        }

        tracing::info!(tracks = tracks.len(), "Generated fallback recommendations");
        Recommendations {
            tracks: tracks.iter().map(PublicTrack::from).collect(),
            message: Some(message.to_string()),
        }
    }
}
