use std::collections::{BTreeSet, HashMap};

use crate::models::{Tag, TaggedTrack, Track};

/// Ordered set of distinct tag names for one comparison context
#[derive(Debug, Clone, Default)]
pub struct TagUniverse {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl TagUniverse {
    /// Builds the universe over every tag in `tag_sets`, sorted by name
    pub fn from_tag_sets<'t>(tag_sets: impl IntoIterator<Item = &'t [Tag]>) -> Self {
        let names: Vec<String> = tag_sets
            .into_iter()
            .flatten()
            .map(|tag| tag.name.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Weight vector for `tags` over this universe
    ///
    /// Tags outside the universe are ignored. When a name repeats, the first
    /// (heaviest) weight wins.
    pub fn vectorize(&self, tags: &[Tag]) -> Vec<f64> {
        let mut vector = vec![0.0; self.names.len()];
        let mut filled = vec![false; self.names.len()];
        for tag in tags {
            if let Some(&i) = self.index.get(&tag.name.to_lowercase()) {
                if !filled[i] {
                    vector[i] = tag.weight;
                    filled[i] = true;
                }
            }
        }
        vector
    }
}

/// Cosine of the angle between `a` and `b`, or 0 when either has zero norm
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A candidate track with its similarity to a source track
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTrack {
    pub track: Track,
    pub score: f64,
}

/// Narrows a candidate pool to the tracks most similar to one source track
#[derive(Debug, Clone, Copy)]
pub struct SimilarityRanker {
    num_similar: usize,
}

impl SimilarityRanker {
    pub fn new(num_similar: usize) -> Self {
        Self { num_similar }
    }

    /// Top `num_similar` candidates by cosine similarity of tag vectors
    ///
    /// The source itself is never returned. Equal scores keep pool order.
    pub fn rank(&self, source: &Track, source_tags: &[Tag], candidates: &[TaggedTrack]) -> Vec<ScoredTrack> {
        if source_tags.is_empty() {
            return Vec::new();
        }

        let source_key = source.key();
        let pool: Vec<&TaggedTrack> = candidates
            .iter()
            .filter(|c| !c.tags.is_empty() && c.track.key() != source_key)
            .collect();
        if pool.is_empty() {
            return Vec::new();
        }

        let universe = TagUniverse::from_tag_sets(
            std::iter::once(source_tags).chain(pool.iter().map(|c| c.tags.as_slice())),
        );
        let source_vector = universe.vectorize(source_tags);

        let mut scored: Vec<ScoredTrack> = pool
            .into_iter()
            .map(|candidate| ScoredTrack {
                track: candidate.track.clone(),
                score: cosine_similarity(&source_vector, &universe.vectorize(&candidate.tags)),
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.num_similar);

        tracing::debug!(
            source = %source_key,
            universe = universe.len(),
            kept = scored.len(),
            "Ranked similar tracks"
        );
        scored
    }
}
