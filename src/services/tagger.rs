use std::collections::HashMap;

use crate::{
    models::{Tag, TaggedTrack, Track, TrackKey},
    services::providers::MusicProvider,
};

/// Maximum tags kept per track
pub const TAGS_PER_TRACK: u32 = 10;

/// Resolves tracks to their weighted tags, memoized for one recommendation run
///
/// A track with no tags (unknown to the provider, or lookup failure) is
/// remembered as such and simply cannot take part in similarity scoring.
pub struct Tagger<'a> {
    provider: &'a dyn MusicProvider,
    limit: u32,
    memo: HashMap<TrackKey, Vec<Tag>>,
}

impl<'a> Tagger<'a> {
    pub fn new(provider: &'a dyn MusicProvider, limit: u32) -> Self {
        Self {
            provider,
            limit,
            memo: HashMap::new(),
        }
    }

    /// Tags for `(artist, name)`, at most `limit` of them, heaviest first
    pub async fn tags_for(&mut self, artist: &str, name: &str) -> Vec<Tag> {
        let key = TrackKey::new(artist, name);
        if let Some(tags) = self.memo.get(&key) {
            return tags.clone();
        }

        let mut tags = if artist.is_empty() || name.is_empty() {
            Vec::new()
        } else {
            self.provider.fetch_track_tags(artist, name, self.limit).await
        };
        tags.truncate(self.limit as usize);

        if tags.is_empty() {
            tracing::debug!(track = %key, "No tags resolved for track");
        }

        self.memo.insert(key, tags.clone());
        tags
    }

    pub async fn tags_for_track(&mut self, track: &Track) -> Vec<Tag> {
        self.tags_for(&track.artist, &track.name).await
    }

    /// Pairs every track with its tags
    pub async fn tag_all(&mut self, tracks: &[Track]) -> Vec<TaggedTrack> {
        let mut tagged = Vec::with_capacity(tracks.len());
        for track in tracks {
            let tags = self.tags_for_track(track).await;
            tagged.push(TaggedTrack::new(track.clone(), tags));
        }
        tagged
    }

    /// Number of distinct tracks looked up so far in this run
    pub fn lookups(&self) -> usize {
        self.memo.len()
    }
}

/// Sums tag weights across tag lists, heaviest first
///
/// Ties keep the order in which the tags were first seen.
pub fn rank_tag_weights<'t>(tag_lists: impl IntoIterator<Item = &'t [Tag]>) -> Vec<(String, f64)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<(String, f64)> = Vec::new();

    for tags in tag_lists {
        for tag in tags {
            let name = tag.name.to_lowercase();
            if name.is_empty() {
                continue;
            }
            match positions.get(&name) {
                Some(&i) => totals[i].1 += tag.weight,
                None => {
                    positions.insert(name.clone(), totals.len());
                    totals.push((name, tag.weight));
                }
            }
        }
    }

    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    totals
}

/// The `n` heaviest tags across the identifiable tracks in `tracks`
pub async fn top_tags(tagger: &mut Tagger<'_>, tracks: &[Track], n: usize) -> Vec<String> {
    let mut tag_lists = Vec::new();
    for track in tracks.iter().filter(|t| t.is_identifiable()) {
        let tags = tagger.tags_for_track(track).await;
        if !tags.is_empty() {
            tag_lists.push(tags);
        }
    }

    rank_tag_weights(tag_lists.iter().map(Vec::as_slice))
        .into_iter()
        .take(n)
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockMusicProvider;

    #[tokio::test]
    async fn test_lookups_are_memoized_case_insensitively() {
        let mut provider = MockMusicProvider::new();
        provider
            .expect_fetch_track_tags()
            .times(1)
            .returning(|_, _, _| vec![Tag::new("rock", 50.0)]);

        let mut tagger = Tagger::new(&provider, TAGS_PER_TRACK);
        let first = tagger.tags_for("A", "X").await;
        let second = tagger.tags_for("a", "x").await;

        assert_eq!(first, vec![Tag::new("rock", 50.0)]);
        assert_eq!(second, first);
        assert_eq!(tagger.lookups(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_memoized() {
        let mut provider = MockMusicProvider::new();
        provider
            .expect_fetch_track_tags()
            .times(1)
            .returning(|_, _, _| Vec::new());

        let mut tagger = Tagger::new(&provider, TAGS_PER_TRACK);
        assert!(tagger.tags_for("Nobody", "Nothing").await.is_empty());
        assert!(tagger.tags_for("Nobody", "Nothing").await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_artist_skips_provider() {
        let mut provider = MockMusicProvider::new();
        provider.expect_fetch_track_tags().times(0);

        let mut tagger = Tagger::new(&provider, TAGS_PER_TRACK);
        assert!(tagger.tags_for("", "Untitled").await.is_empty());
    }

    #[tokio::test]
    async fn test_tags_truncated_to_limit() {
        let mut provider = MockMusicProvider::new();
        provider.expect_fetch_track_tags().returning(|_, _, _| {
            (0..15)
                .map(|i| Tag::new(&format!("tag{}", i), 100.0 - i as f64))
                .collect()
        });

        let mut tagger = Tagger::new(&provider, TAGS_PER_TRACK);
        let tags = tagger.tags_for("A", "X").await;

        assert_eq!(tags.len(), 10);
        assert_eq!(tags[0].name, "tag0");
    }

    #[test]
    fn test_rank_tag_weights_sums_and_orders() {
        let a = vec![Tag::new("rock", 50.0), Tag::new("indie", 30.0)];
        let b = vec![Tag::new("Indie", 40.0), Tag::new("pop", 10.0)];

        let ranked = rank_tag_weights([a.as_slice(), b.as_slice()]);

        assert_eq!(
            ranked,
            vec![
                ("indie".to_string(), 70.0),
                ("rock".to_string(), 50.0),
                ("pop".to_string(), 10.0),
            ]
        );
    }

    #[test]
    fn test_rank_tag_weights_ties_keep_first_seen_order() {
        let a = vec![Tag::new("dub", 10.0), Tag::new("ska", 10.0)];
        let b = vec![Tag::new("reggae", 10.0)];

        let ranked: Vec<String> = rank_tag_weights([a.as_slice(), b.as_slice()])
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        assert_eq!(ranked, vec!["dub", "ska", "reggae"]);
    }

    #[tokio::test]
    async fn test_top_tags_skips_unidentifiable_and_limits() {
        let mut provider = MockMusicProvider::new();
        provider
            .expect_fetch_track_tags()
            .withf(|artist, name, _| artist == "A" && name == "X")
            .returning(|_, _, _| vec![Tag::new("rock", 50.0), Tag::new("grunge", 20.0)]);
        provider
            .expect_fetch_track_tags()
            .withf(|artist, name, _| artist == "B" && name == "Y")
            .returning(|_, _, _| vec![Tag::new("grunge", 40.0)]);

        let mut tagger = Tagger::new(&provider, TAGS_PER_TRACK);
        let tracks = vec![
            Track::new("A", "X"),
            Track::new("", "Nameless artist"),
            Track::new("B", "Y"),
        ];

        let tags = top_tags(&mut tagger, &tracks, 1).await;
        assert_eq!(tags, vec!["grunge"]);
    }

    #[tokio::test]
    async fn test_top_tags_empty_history() {
        let provider = MockMusicProvider::new();
        let mut tagger = Tagger::new(&provider, TAGS_PER_TRACK);

        assert!(top_tags(&mut tagger, &[], 10).await.is_empty());
    }
}
