use std::collections::HashSet;

use crate::error::{AppError, AppResult};
use crate::services::features::FeatureTable;

/// Per-column z-score parameters learned from training rows
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    /// Fits means and population standard deviations column by column
    ///
    /// Columns with zero variance get a scale of 1 so they standardize to 0.
    pub fn fit(rows: &[Vec<f64>]) -> AppResult<Self> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| AppError::Model("cannot fit scaler on zero rows".to_string()))?;
        if rows.iter().any(|row| row.len() != width) {
            return Err(AppError::Model("ragged feature rows".to_string()));
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        means.iter_mut().for_each(|mean| *mean /= n);

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((var, value), mean) in scales.iter_mut().zip(row).zip(&means) {
                *var += (value - mean).powi(2);
            }
        }
        for scale in scales.iter_mut() {
            let std = (*scale / n).sqrt();
            *scale = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        }

        Ok(Self { means, scales })
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Standardizes `row` with the fitted parameters
    pub fn transform(&self, row: &[f64]) -> AppResult<Vec<f64>> {
        if row.len() != self.width() {
            return Err(AppError::Model(format!(
                "expected {} features, got {}",
                self.width(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((value, mean), scale)| (value - mean) / scale)
            .collect())
    }
}

/// Training subset of a feature table
///
/// `row_ids[i]` is the feature-table row that `values[i]` came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainedTable {
    pub columns: Vec<String>,
    pub row_ids: Vec<usize>,
    pub values: Vec<Vec<f64>>,
}

impl TrainedTable {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Euclidean distance between two equally sized vectors
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Indices of the `k` points nearest to `query`, closest first
///
/// Equal distances are ordered by lower index.
pub fn k_nearest(query: &[f64], points: &[Vec<f64>], k: usize) -> Vec<usize> {
    let mut distances: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, point)| (i, euclidean_distance(query, point)))
        .collect();
    distances.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    distances.into_iter().take(k).map(|(i, _)| i).collect()
}

/// Standardized Euclidean k-nearest-neighbor recommender
pub struct NeighborRecommender {
    n_neighbors: usize,
    scaler: Option<Standardizer>,
}

impl NeighborRecommender {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            scaler: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.scaler.is_some()
    }

    /// Selects the usable part of `table` and fits the scaler on it
    ///
    /// Columns with no finite value are dropped, then rows with any
    /// non-finite value. An empty result leaves the recommender untrained.
    pub fn train(&mut self, table: &FeatureTable) -> AppResult<TrainedTable> {
        let rows = table.rows();
        let keep_columns: Vec<usize> = (0..table.columns().len())
            .filter(|&c| rows.iter().any(|row| row.get(c).is_some_and(|v| v.is_finite())))
            .collect();

        let mut trained = TrainedTable {
            columns: keep_columns
                .iter()
                .map(|&c| table.columns()[c].clone())
                .collect(),
            ..TrainedTable::default()
        };

        for (i, row) in rows.iter().enumerate() {
            let values: Vec<f64> = keep_columns
                .iter()
                .map(|&c| row.get(c).copied().unwrap_or(f64::NAN))
                .collect();
            if values.iter().all(|v| v.is_finite()) {
                trained.row_ids.push(i);
                trained.values.push(values);
            }
        }

        let dropped_rows = rows.len() - trained.len();
        if dropped_rows > 0 || keep_columns.len() < table.columns().len() {
            tracing::warn!(
                dropped_rows = dropped_rows,
                dropped_columns = table.columns().len() - keep_columns.len(),
                "Dropped incomplete feature data"
            );
        }

        if trained.is_empty() || trained.columns.is_empty() {
            self.scaler = None;
            return Ok(TrainedTable::default());
        }

        self.scaler = Some(Standardizer::fit(&trained.values)?);
        tracing::info!(
            rows = trained.len(),
            columns = trained.columns.len(),
            "Trained neighbor model"
        );
        Ok(trained)
    }

    /// Candidate indices nearest to any seed, first occurrence order
    ///
    /// For each seed the `min(n_neighbors, candidates)` nearest candidates are
    /// taken; results across seeds are concatenated and deduplicated.
    pub fn recommend(&self, seeds: &[Vec<f64>], candidates: &[Vec<f64>]) -> AppResult<Vec<usize>> {
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| AppError::Model("neighbor model used before training".to_string()))?;

        let scaled_candidates = candidates
            .iter()
            .map(|row| scaler.transform(row))
            .collect::<AppResult<Vec<_>>>()?;
        let k = self.n_neighbors.min(scaled_candidates.len());

        let mut seen = HashSet::new();
        let mut picked = Vec::new();
        for seed in seeds {
            let scaled_seed = scaler.transform(seed)?;
            for index in k_nearest(&scaled_seed, &scaled_candidates, k) {
                if seen.insert(index) {
                    picked.push(index);
                }
            }
        }

        tracing::debug!(seeds = seeds.len(), k = k, picked = picked.len(), "Nearest neighbors found");
        Ok(picked)
    }
}
