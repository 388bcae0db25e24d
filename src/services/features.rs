use std::collections::{BTreeSet, HashMap};

use crate::models::{TaggedTrack, Track};
use crate::services::tagger::TAGS_PER_TRACK;

/// Dense track × tag weight matrix with a known/new flag per row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    is_known: Vec<bool>,
    tracks: Vec<Track>,
}

impl FeatureTable {
    /// Sorted tag names, one per column
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_known(&self, row: usize) -> bool {
        self.is_known.get(row).copied().unwrap_or(false)
    }

    pub fn track(&self, row: usize) -> Option<&Track> {
        self.tracks.get(row)
    }

    /// Indices of rows that belong to the listener's history
    pub fn known_rows(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_known[i]).collect()
    }

    /// Indices of rows that are recommendation candidates
    pub fn candidate_rows(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| !self.is_known[i]).collect()
    }
}

/// Builds the feature table from tagged known and candidate tracks
#[derive(Debug, Clone, Copy)]
pub struct FeatureMatrixBuilder {
    tags_per_track: usize,
}

impl Default for FeatureMatrixBuilder {
    fn default() -> Self {
        Self::new(TAGS_PER_TRACK as usize)
    }
}

impl FeatureMatrixBuilder {
    pub fn new(tags_per_track: usize) -> Self {
        Self { tags_per_track }
    }

    /// Known rows come first, then candidates; both keep their input order.
    /// Tracks without tags are left out.
    pub fn build(&self, known: &[TaggedTrack], candidates: &[TaggedTrack]) -> FeatureTable {
        let tagged: Vec<(&TaggedTrack, bool)> = known
            .iter()
            .map(|t| (t, true))
            .chain(candidates.iter().map(|t| (t, false)))
            .filter(|(t, _)| !t.tags.is_empty())
            .collect();

        let columns: Vec<String> = tagged
            .iter()
            .flat_map(|(t, _)| t.tags.iter().take(self.tags_per_track))
            .map(|tag| tag.name.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let column_index: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut table = FeatureTable {
            columns: columns.clone(),
            ..FeatureTable::default()
        };

        for (tagged_track, known) in tagged {
            let mut row = vec![0.0; columns.len()];
            let mut filled = vec![false; columns.len()];
            for tag in tagged_track.tags.iter().take(self.tags_per_track) {
                if let Some(&i) = column_index.get(tag.name.to_lowercase().as_str()) {
                    if !filled[i] {
                        row[i] = tag.weight;
                        filled[i] = true;
                    }
                }
            }
            table.rows.push(row);
            table.is_known.push(known);
            table.tracks.push(tagged_track.track.clone());
        }

        tracing::debug!(
            rows = table.len(),
            columns = table.columns.len(),
            known = table.known_rows().len(),
            "Built feature table"
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;

    fn tagged(artist: &str, name: &str, tags: &[(&str, f64)]) -> TaggedTrack {
        TaggedTrack::new(
            Track::new(artist, name),
            tags.iter().map(|(n, w)| Tag::new(n, *w)).collect(),
        )
    }

    #[test]
    fn test_build_dense_sorted_columns() {
        let known = vec![tagged("A", "X", &[("rock", 50.0), ("indie", 10.0)])];
        let candidates = vec![tagged("B", "Y", &[("ambient", 30.0), ("rock", 20.0)])];

        let table = FeatureMatrixBuilder::default().build(&known, &candidates);

        assert_eq!(table.columns(), &["ambient", "indie", "rock"]);
        assert_eq!(table.rows(), &[vec![0.0, 10.0, 50.0], vec![30.0, 0.0, 20.0]]);
        assert!(table.is_known(0));
        assert!(!table.is_known(1));
        assert_eq!(table.track(1), Some(&Track::new("B", "Y")));
    }

    #[test]
    fn test_tagless_tracks_are_dropped() {
        let known = vec![
            tagged("A", "Bare", &[]),
            tagged("A", "X", &[("rock", 50.0)]),
        ];
        let candidates = vec![
            tagged("B", "Bare", &[]),
            tagged("B", "Y", &[("rock", 40.0)]),
        ];

        let table = FeatureMatrixBuilder::default().build(&known, &candidates);

        assert_eq!(table.len(), 2);
        assert_eq!(table.known_rows(), vec![0]);
        assert_eq!(table.candidate_rows(), vec![1]);
        assert_eq!(table.track(0).map(|t| t.name.as_str()), Some("X"));
    }

    #[test]
    fn test_only_top_tags_become_columns() {
        let known = vec![tagged("A", "X", &[("rock", 50.0), ("indie", 40.0), ("pop", 1.0)])];

        let table = FeatureMatrixBuilder::new(2).build(&known, &[]);

        assert_eq!(table.columns(), &["indie", "rock"]);
    }

    #[test]
    fn test_all_tagless_is_empty() {
        let known = vec![tagged("A", "X", &[])];
        let table = FeatureMatrixBuilder::default().build(&known, &[]);

        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert!(table.known_rows().is_empty());
    }
}
