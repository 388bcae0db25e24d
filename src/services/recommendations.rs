use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::{
    error::{AppError, AppResult},
    models::{dedup_by_key, PublicTrack, Recommendations, Track},
    services::{
        fallback::{FallbackRecommender, FallbackSettings},
        features::FeatureMatrixBuilder,
        neighbors::NeighborRecommender,
        providers::MusicProvider,
        similarity::SimilarityRanker,
        tag_cache::TagCache,
        tagger::{top_tags, Tagger, TAGS_PER_TRACK},
    },
};

pub const NO_PERFECT_MATCH: &str =
    "Our recommendation algorithm couldn't find perfect matches, but here are some songs you might still enjoy.";
pub const PIPELINE_ERROR: &str =
    "Our recommendation algorithm encountered an error, but here are some songs you might still enjoy.";

/// Tunables for one recommendation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationSettings {
    /// Listener tags used to build the candidate pool
    pub num_candidate_tags: usize,
    /// Tracks fetched per candidate tag
    pub tracks_per_tag: u32,
    /// Similar tracks kept per known track
    pub num_similar: usize,
    pub n_neighbors: usize,
    pub tags_per_track: u32,
    pub fallback: FallbackSettings,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            num_candidate_tags: 10,
            tracks_per_tag: 20,
            num_similar: 2,
            n_neighbors: 20,
            tags_per_track: TAGS_PER_TRACK,
            fallback: FallbackSettings::default(),
        }
    }
}

/// Step of the similarity + neighbor path that can give up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    CandidateGeneration,
    NewTrackFilter,
    FeatureBuild,
    Train,
    Seed,
    Recommend,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::CandidateGeneration => "candidate_generation",
            PipelineStage::NewTrackFilter => "new_track_filter",
            PipelineStage::FeatureBuild => "feature_build",
            PipelineStage::Train => "train",
            PipelineStage::Seed => "seed",
            PipelineStage::Recommend => "recommend",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, PartialEq)]
enum PipelineOutcome {
    Recommended(Vec<Track>),
    /// The stage produced nothing to work with
    Fallback(PipelineStage),
}

/// Track recommendation engine
///
/// Narrows tracks from the listener's favourite tags to those most similar to
/// what they already play, then ranks them with a nearest-neighbor model over
/// tag weights. Whenever a step comes up empty or fails, recommendations come
/// from tag popularity instead and carry an explanatory message.
pub struct RecommendationService {
    provider: Arc<dyn MusicProvider>,
    tag_cache: TagCache,
    fallback: FallbackRecommender,
    settings: RecommendationSettings,
}

impl RecommendationService {
    pub fn new(provider: Arc<dyn MusicProvider>, tag_cache: TagCache, settings: RecommendationSettings) -> Self {
        let fallback = FallbackRecommender::new(provider.clone(), tag_cache.clone(), settings.fallback);
        Self {
            provider,
            tag_cache,
            fallback,
            settings,
        }
    }

    pub fn tag_cache(&self) -> &TagCache {
        &self.tag_cache
    }

    /// Recommendations for a listener's known tracks
    ///
    /// Never fails: `message` is `None` only when the full path succeeded.
    pub async fn generate_recommendations(&self, known: &[Track]) -> Recommendations {
        let mut tagger = Tagger::new(self.provider.as_ref(), self.settings.tags_per_track);
        let outcome = self.run_pipeline(&mut tagger, known).await;
        self.complete(&mut tagger, known, outcome).await
    }

    /// Turns a pipeline outcome into recommendations, falling back when needed
    async fn complete(
        &self,
        tagger: &mut Tagger<'_>,
        known: &[Track],
        outcome: AppResult<PipelineOutcome>,
    ) -> Recommendations {
        let message = match outcome {
            Ok(PipelineOutcome::Recommended(tracks)) => {
                tracing::info!(
                    known = known.len(),
                    recommended = tracks.len(),
                    tag_lookups = tagger.lookups(),
                    "Generated recommendations"
                );
                return Recommendations {
                    tracks: tracks.iter().map(PublicTrack::from).collect(),
                    message: None,
                };
            }
            Ok(PipelineOutcome::Fallback(stage)) => {
                tracing::info!(stage = %stage, "No results from stage, using fallback recommendations");
                NO_PERFECT_MATCH
            }
            Err(e) => {
                tracing::error!(error = %e, "Recommendation pipeline failed, using fallback recommendations");
                PIPELINE_ERROR
            }
        };

        self.fallback.recommend(tagger, known, message).await
    }

    /// Recommendations from a Last.fm user's top tracks
    pub async fn recommend_for_user(&self, username: &str, period: &str, limit: u32) -> AppResult<Recommendations> {
        let known = self.provider.fetch_top_tracks(username, period, limit).await;
        if known.is_empty() {
            return Err(AppError::NotFound(format!(
                "Unable to retrieve listening history for {}. Please check the username and try again.",
                username
            )));
        }

        tracing::info!(username = %username, tracks = known.len(), "Fetched listening history");
        Ok(self.generate_recommendations(&known).await)
    }

    /// Tracks similar to the known ones, drawn from the listener's top tags
    ///
    /// The result is deduplicated and shuffled.
    async fn generate_candidates(&self, tagger: &mut Tagger<'_>, known: &[Track]) -> Vec<Track> {
        let tags = top_tags(tagger, known, self.settings.num_candidate_tags).await;
        tracing::info!(tags = ?tags, "Top tags for candidate generation");

        let mut pool = Vec::new();
        for tag in &tags {
            pool.extend(
                self.tag_cache
                    .get_tracks_for_tag(tag, self.provider.as_ref(), self.settings.tracks_per_tag, false)
                    .await,
            );
        }
        let pool = tagger.tag_all(&dedup_by_key(pool)).await;

        let ranker = SimilarityRanker::new(self.settings.num_similar);
        let mut similar = Vec::new();
        for track in known.iter().filter(|t| t.is_identifiable()) {
            let tags = tagger.tags_for_track(track).await;
            similar.extend(ranker.rank(track, &tags, &pool).into_iter().map(|s| s.track));
        }

        let mut candidates = dedup_by_key(similar);
        candidates.shuffle(&mut rand::rng());
        tracing::info!(pool = pool.len(), candidates = candidates.len(), "Generated candidate tracks");
        candidates
    }

    async fn run_pipeline(&self, tagger: &mut Tagger<'_>, known: &[Track]) -> AppResult<PipelineOutcome> {
        let candidates = self.generate_candidates(tagger, known).await;
        if candidates.is_empty() {
            return Ok(PipelineOutcome::Fallback(PipelineStage::CandidateGeneration));
        }

        let known_keys: HashSet<_> = known.iter().map(Track::key).collect();
        let new_tracks: Vec<Track> = candidates
            .into_iter()
            .filter(|track| !known_keys.contains(&track.key()))
            .collect();
        if new_tracks.is_empty() {
            return Ok(PipelineOutcome::Fallback(PipelineStage::NewTrackFilter));
        }

        let tagged_known = tagger.tag_all(known).await;
        let tagged_new = tagger.tag_all(&new_tracks).await;
        let table = FeatureMatrixBuilder::new(self.settings.tags_per_track as usize).build(&tagged_known, &tagged_new);
        if table.is_empty() {
            return Ok(PipelineOutcome::Fallback(PipelineStage::FeatureBuild));
        }

        let mut model = NeighborRecommender::new(self.settings.n_neighbors);
        let trained = model.train(&table)?;
        if trained.is_empty() {
            return Ok(PipelineOutcome::Fallback(PipelineStage::Train));
        }

        let seeds: Vec<Vec<f64>> = trained
            .row_ids
            .iter()
            .zip(&trained.values)
            .filter(|(row, _)| table.is_known(**row))
            .map(|(_, values)| values.clone())
            .collect();
        if seeds.is_empty() {
            return Ok(PipelineOutcome::Fallback(PipelineStage::Seed));
        }

        let mut recommended = Vec::new();
        for index in model.recommend(&seeds, &trained.values)? {
            let row = *trained
                .row_ids
                .get(index)
                .ok_or_else(|| AppError::Model(format!("neighbor index {} out of range", index)))?;
            if table.is_known(row) {
                continue;
            }
            let track = table
                .track(row)
                .ok_or_else(|| AppError::Model(format!("feature row {} has no track", row)))?;
            recommended.push(track.clone());
        }
        if recommended.is_empty() {
            return Ok(PipelineOutcome::Fallback(PipelineStage::Recommend));
        }

        Ok(PipelineOutcome::Recommended(recommended))
    }
}
