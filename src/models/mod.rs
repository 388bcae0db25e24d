use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod lastfm;

pub use lastfm::{ApiTag, ApiTrack};

/// Case-insensitive (artist, name) identity of a track
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    artist: String,
    name: String,
}

impl TrackKey {
    pub fn new(artist: &str, name: &str) -> Self {
        Self {
            artist: artist.to_lowercase(),
            name: name.to_lowercase(),
        }
    }
}

impl Display for TrackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.artist, self.name)
    }
}

/// A track as used throughout the recommendation engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub playcount: u64,
    #[serde(default)]
    pub listeners: u64,
    #[serde(default)]
    pub mbid: String,
    #[serde(default)]
    pub url: String,
}

impl Track {
    /// Creates a track with only its identifying fields set
    pub fn new(artist: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            playcount: 0,
            listeners: 0,
            mbid: String::new(),
            url: String::new(),
        }
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.artist, &self.name)
    }

    /// Whether both artist and name are present, which tag lookups require
    pub fn is_identifiable(&self) -> bool {
        !self.artist.is_empty() && !self.name.is_empty()
    }
}

/// A weighted tag attached to a track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Lowercased tag name
    pub name: String,
    pub weight: f64,
}

impl Tag {
    pub fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_lowercase(),
            weight,
        }
    }
}

/// A track paired with its resolved tags
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTrack {
    pub track: Track,
    pub tags: Vec<Tag>,
}

impl TaggedTrack {
    pub fn new(track: Track, tags: Vec<Tag>) -> Self {
        Self { track, tags }
    }
}

/// Track shape returned to API consumers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicTrack {
    pub name: String,
    pub artist: String,
    pub playcount: u64,
    pub listeners: u64,
    pub mbid: String,
    pub url: String,
}

impl From<&Track> for PublicTrack {
    fn from(track: &Track) -> Self {
        PublicTrack {
            name: track.name.clone(),
            artist: track.artist.clone(),
            playcount: track.playcount,
            listeners: track.listeners,
            mbid: track.mbid.clone(),
            url: track.url.clone(),
        }
    }
}

/// Outcome of a recommendation run
///
/// `message` is `None` only when the full similarity + neighbor path produced
/// the tracks; every fallback branch sets a user-facing explanation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    pub tracks: Vec<PublicTrack>,
    pub message: Option<String>,
}

/// Request body for recommending from caller-supplied history
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub tracks: Vec<Track>,
}

/// Keeps the first track for every identity key, preserving order
pub fn dedup_by_key(tracks: impl IntoIterator<Item = Track>) -> Vec<Track> {
    let mut seen = std::collections::HashSet::new();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_key_is_case_insensitive() {
        let a = Track::new("Radiohead", "Airbag");
        let b = Track::new("RADIOHEAD", "airbag");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_track_key_display() {
        let key = TrackKey::new("Boards of Canada", "Roygbiv");
        assert_eq!(format!("{}", key), "boards of canada|roygbiv");
    }

    #[test]
    fn test_track_key_distinguishes_artist() {
        assert_ne!(TrackKey::new("A", "Song"), TrackKey::new("B", "Song"));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut first = Track::new("Massive Attack", "Teardrop");
        first.playcount = 10;
        let mut dup = Track::new("massive attack", "TEARDROP");
        dup.playcount = 99;
        let other = Track::new("Portishead", "Roads");

        let deduped = dedup_by_key(vec![first.clone(), other.clone(), dup]);

        assert_eq!(deduped, vec![first, other]);
    }

    #[test]
    fn test_track_deserialize_defaults() {
        let track: Track = serde_json::from_str(r#"{"name": "Roads", "artist": "Portishead"}"#).unwrap();
        assert_eq!(track.playcount, 0);
        assert_eq!(track.listeners, 0);
        assert_eq!(track.mbid, "");
        assert_eq!(track.url, "");
    }

    #[test]
    fn test_public_track_projection() {
        let mut track = Track::new("Portishead", "Roads");
        track.playcount = 12;
        track.listeners = 3400;
        track.url = "https://www.last.fm/music/Portishead/_/Roads".to_string();

        let public = PublicTrack::from(&track);
        assert_eq!(public.name, "Roads");
        assert_eq!(public.artist, "Portishead");
        assert_eq!(public.playcount, 12);
        assert_eq!(public.listeners, 3400);
        assert_eq!(public.url, track.url);
    }

    #[test]
    fn test_tag_name_lowercased() {
        let tag = Tag::new("Trip-Hop", 100.0);
        assert_eq!(tag.name, "trip-hop");
    }

    #[test]
    fn test_is_identifiable() {
        assert!(Track::new("A", "X").is_identifiable());
        assert!(!Track::new("", "X").is_identifiable());
        assert!(!Track::new("A", "").is_identifiable());
    }
}
