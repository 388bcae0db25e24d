//! Raw Last.fm API payloads
//!
//! Last.fm is loose about shapes: counts arrive as numbers or strings, the
//! artist is a bare string in some methods and an object in others, and a
//! one-element list is collapsed to a single object. Everything here is
//! converted to [`Track`] / [`Tag`] once, at ingestion.

use serde::Deserialize;

use super::{Tag, Track};

/// A list field that Last.fm may collapse to a single object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Numeric statistic sent either as a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiCount {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl ApiCount {
    fn as_u64(&self) -> u64 {
        match self {
            ApiCount::Integer(n) => *n,
            ApiCount::Float(f) if f.is_finite() && *f >= 0.0 => *f as u64,
            ApiCount::Float(_) => 0,
            ApiCount::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }

    fn as_f64(&self) -> f64 {
        let value = match self {
            ApiCount::Integer(n) => *n as f64,
            ApiCount::Float(f) => *f,
            ApiCount::Text(s) => s.trim().parse().unwrap_or(0.0),
        };
        if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        }
    }
}

/// Artist reference: `"Name"`, `{"name": "Name"}` or `{"#text": "Name"}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiArtist {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
        #[serde(rename = "#text", default)]
        text: Option<String>,
    },
}

impl ApiArtist {
    fn into_name(self) -> String {
        match self {
            ApiArtist::Name(name) => name,
            ApiArtist::Object { name, text } => name.or(text).unwrap_or_default(),
        }
    }
}

/// Track record as returned by `user.gettoptracks` and `tag.gettoptracks`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<ApiArtist>,
    #[serde(default)]
    pub playcount: Option<ApiCount>,
    #[serde(default)]
    pub listeners: Option<ApiCount>,
    #[serde(default)]
    pub mbid: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<ApiTrack> for Track {
    fn from(raw: ApiTrack) -> Self {
        Track {
            name: raw.name.unwrap_or_default(),
            artist: raw.artist.map(ApiArtist::into_name).unwrap_or_default(),
            playcount: raw.playcount.as_ref().map(ApiCount::as_u64).unwrap_or(0),
            listeners: raw.listeners.as_ref().map(ApiCount::as_u64).unwrap_or(0),
            mbid: raw.mbid.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
        }
    }
}

/// Tag record as returned by `track.gettoptags`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTag {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub count: Option<ApiCount>,
}

impl ApiTag {
    /// Converts to a [`Tag`], discarding tags without a name
    pub fn into_tag(self) -> Option<Tag> {
        let name = self.name?.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }
        let weight = self.count.as_ref().map(ApiCount::as_f64).unwrap_or(0.0);
        Some(Tag { name, weight })
    }
}

/// Converts raw tags, keeping at most `limit` named tags in provider order
pub fn tags_from_api(raw: Vec<ApiTag>, limit: usize) -> Vec<Tag> {
    raw.into_iter()
        .filter_map(ApiTag::into_tag)
        .take(limit)
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct TrackList {
    #[serde(default)]
    pub track: OneOrMany<ApiTrack>,
}

#[derive(Debug, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub tag: OneOrMany<ApiTag>,
}

/// `user.gettoptracks` envelope
#[derive(Debug, Deserialize)]
pub struct TopTracksResponse {
    pub toptracks: TrackList,
}

/// `track.gettoptags` envelope
#[derive(Debug, Deserialize)]
pub struct TopTagsResponse {
    pub toptags: TagList,
}

/// `tag.gettoptracks` envelope
#[derive(Debug, Deserialize)]
pub struct TagTracksResponse {
    pub tracks: TrackList,
}

/// Error body Last.fm returns with HTTP 200 or 4xx
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: u32,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_tracks_with_artist_object_and_string_counts() {
        let json = r#"{
            "toptracks": {
                "track": [{
                    "name": "Teardrop",
                    "playcount": "42",
                    "mbid": "abc",
                    "url": "https://www.last.fm/music/Massive+Attack/_/Teardrop",
                    "artist": {"name": "Massive Attack", "mbid": "x", "url": "y"},
                    "@attr": {"rank": "1"}
                }],
                "@attr": {"user": "someone"}
            }
        }"#;

        let response: TopTracksResponse = serde_json::from_str(json).unwrap();
        let tracks: Vec<Track> = response
            .toptracks
            .track
            .into_vec()
            .into_iter()
            .map(Track::from)
            .collect();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist, "Massive Attack");
        assert_eq!(tracks[0].name, "Teardrop");
        assert_eq!(tracks[0].playcount, 42);
        assert_eq!(tracks[0].listeners, 0);
        assert_eq!(tracks[0].mbid, "abc");
    }

    #[test]
    fn test_artist_as_plain_string_and_text_field() {
        let plain: ApiTrack = serde_json::from_str(r#"{"name": "Roads", "artist": "Portishead"}"#).unwrap();
        assert_eq!(Track::from(plain).artist, "Portishead");

        let text: ApiTrack =
            serde_json::from_str(r##"{"name": "Roads", "artist": {"#text": "Portishead"}}"##).unwrap();
        assert_eq!(Track::from(text).artist, "Portishead");
    }

    #[test]
    fn test_missing_fields_default() {
        let raw: ApiTrack = serde_json::from_str(r#"{}"#).unwrap();
        let track = Track::from(raw);
        assert_eq!(track.name, "");
        assert_eq!(track.artist, "");
        assert_eq!(track.playcount, 0);
        assert_eq!(track.url, "");
    }

    #[test]
    fn test_unparseable_count_defaults_to_zero() {
        let raw: ApiTrack =
            serde_json::from_str(r#"{"name": "X", "artist": "A", "playcount": "lots", "listeners": 7}"#)
                .unwrap();
        let track = Track::from(raw);
        assert_eq!(track.playcount, 0);
        assert_eq!(track.listeners, 7);
    }

    #[test]
    fn test_single_object_list_is_accepted() {
        let json = r#"{"tracks": {"track": {"name": "Only", "artist": {"name": "One"}}}}"#;
        let response: TagTracksResponse = serde_json::from_str(json).unwrap();
        let tracks = response.tracks.track.into_vec();
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_empty_list_field_is_accepted() {
        let response: TopTagsResponse = serde_json::from_str(r#"{"toptags": {}}"#).unwrap();
        assert!(response.toptags.tag.into_vec().is_empty());
    }

    #[test]
    fn test_tags_lowercased_filtered_and_limited() {
        let json = r#"{"toptags": {"tag": [
            {"name": "Trip-Hop", "count": 100},
            {"name": "", "count": 90},
            {"name": "Electronic", "count": "80"},
            {"name": "chillout"}
        ]}}"#;
        let response: TopTagsResponse = serde_json::from_str(json).unwrap();
        let tags = tags_from_api(response.toptags.tag.into_vec(), 2);

        assert_eq!(
            tags,
            vec![Tag::new("trip-hop", 100.0), Tag::new("electronic", 80.0)]
        );
    }

    #[test]
    fn test_tag_without_count_has_zero_weight() {
        let raw: ApiTag = serde_json::from_str(r#"{"name": "ambient"}"#).unwrap();
        assert_eq!(raw.into_tag(), Some(Tag::new("ambient", 0.0)));
    }

    #[test]
    fn test_error_response() {
        let err: ApiErrorResponse =
            serde_json::from_str(r#"{"error": 6, "message": "Track not found"}"#).unwrap();
        assert_eq!(err.error, 6);
        assert_eq!(err.message, "Track not found");
    }
}
