// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Brute-force k-nearest-neighbour classification

use super::design::{CategoricalEncoding, DesignSpec, Scaling};
use super::{FitOptions, ModelAdapter, Predictor};
use crate::error::{EvalError, Result};
use crate::interpret::{ModelSummary, ModelSummaryBuilder};
use crate::metrics::{OutputKind, TaskType};
use crate::split::subsample;
use ndarray::{Array1, Array2, ArrayView1, Axis};

#[derive(Debug, Clone)]
struct NeighbourIndex {
    reference: Array2<f64>,
    labels: Array1<f64>,
    k: usize,
}

impl NeighbourIndex {
    fn vote(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut distances: Vec<(f64, usize)> = self
            .reference
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, r)| {
                let d: f64 = r.iter().zip(row.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                (d, i)
            })
            .collect();

        let k = self.k.min(distances.len());
        let by_distance = |a: &(f64, usize), b: &(f64, usize)| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        };
        if k < distances.len() {
            distances.select_nth_unstable_by(k - 1, by_distance);
            distances.truncate(k);
        }
        distances.sort_by(by_distance);

        let positives = distances.iter().filter(|(_, i)| self.labels[*i] == 1.0).count();
        let negatives = distances.len() - positives;
        match positives.cmp(&negatives) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => 0.0,
            // tie: the single nearest neighbour decides
            std::cmp::Ordering::Equal => distances.first().map_or(0.0, |(_, i)| self.labels[*i]),
        }
    }
}

impl Predictor for NeighbourIndex {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        x.axis_iter(Axis(0)).map(|row| self.vote(row)).collect()
    }
}

/// Majority vote among the `k` closest training rows (Euclidean distance)
#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    k: usize,
    standardize: bool,
}

impl KNearestNeighbors {
    pub fn new(k: usize, standardize: bool) -> Self {
        Self { k: k.max(1), standardize }
    }
}

impl ModelAdapter for KNearestNeighbors {
    fn name(&self) -> &str {
        "KNearestNeighbors"
    }

    fn description(&self) -> &str {
        "Majority vote of the k nearest training rows"
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::Codes
    }

    fn scaling(&self) -> Scaling {
        if self.standardize {
            Scaling::Continuous
        } else {
            Scaling::None
        }
    }

    fn output(&self) -> OutputKind {
        OutputKind::Label
    }

    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)> {
        let picked = subsample(x.nrows(), options.max_train_rows, options.seed);
        if picked.len() < self.k {
            return Err(EvalError::fit(
                self.name(),
                format!("{} reference rows for k = {}", picked.len(), self.k),
            ));
        }

        let index = NeighbourIndex {
            reference: x.select(Axis(0), &picked),
            labels: y.select(Axis(0), &picked),
            k: self.k,
        };

        let summary = ModelSummaryBuilder::new(picked.len())
            .with_features_used(design.names())
            .with_hyperparameter("k", self.k as f64)
            .with_hyperparameter("standardized", if self.standardize { 1.0 } else { 0.0 })
            .build();

        Ok((Box::new(index), summary))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::synthetic_dataset;
    use super::*;
    use crate::features::{ColumnSpec, ModelDataset};
    use ndarray::array;

    fn duration_speech_table(rows: Array2<f64>) -> ModelDataset {
        let ids = (0..rows.nrows()).map(|i| format!("t{}", i)).collect();
        let columns = vec![
            ColumnSpec::continuous("duration_ms"),
            ColumnSpec::continuous("speechiness"),
            ColumnSpec::categorical("explicit", [0, 1]),
        ];
        ModelDataset::new(ids, columns, rows).unwrap()
    }

    #[test]
    fn test_vote_majority_and_tie_break() {
        let index = NeighbourIndex {
            reference: array![[0.0], [1.0], [2.0], [10.0], [11.0]],
            labels: array![1.0, 0.0, 0.0, 1.0, 1.0],
            k: 3,
        };
        assert_eq!(index.vote(array![0.9].view()), 0.0);
        assert_eq!(index.vote(array![10.5].view()), 1.0);

        let even = NeighbourIndex { k: 2, ..index };
        // neighbours at 0.0 (label 1) and 1.0 (label 0): nearest wins
        assert_eq!(even.vote(array![0.2].view()), 1.0);
    }

    #[test]
    fn test_standardizing_changes_the_nearest_neighbour() {
        let train = duration_speech_table(array![
            [200_000.0, 0.05, 0.0],
            [200_000.0, 0.10, 0.0],
            [210_000.0, 0.55, 1.0],
            [210_000.0, 0.60, 1.0],
            [205_000.0, 0.08, 0.0],
            [205_000.0, 0.58, 1.0],
        ]);
        let query = duration_speech_table(array![[210_000.0, 0.07, 0.0]]);

        // raw milliseconds swamp speechiness, so the same-duration explicit rows win
        let raw = KNearestNeighbors::new(1, false);
        let fitted = raw.fit(&train, "explicit", &FitOptions::default()).unwrap();
        assert_eq!(raw.predict(&fitted, &query).unwrap().values, vec![1.0]);

        // on a common scale the low-speechiness row at 205000 ms is closest
        let scaled = KNearestNeighbors::new(1, true);
        let fitted = scaled.fit(&train, "explicit", &FitOptions::default()).unwrap();
        assert_eq!(scaled.predict(&fitted, &query).unwrap().values, vec![0.0]);
        assert_eq!(fitted.summary().hyperparameters["standardized"], 1.0);
    }

    #[test]
    fn test_knn_on_training_rows_with_k1_is_exact() {
        let data = synthetic_dataset(120, 2);
        let adapter = KNearestNeighbors::new(1, true);
        let fitted = adapter.fit(&data, "explicit", &FitOptions::default()).unwrap();
        let predicted = adapter.predict(&fitted, &data).unwrap();

        assert_eq!(predicted.kind, OutputKind::Label);
        assert_eq!(predicted.values, data.column("explicit").unwrap().to_vec());
        assert_eq!(fitted.summary().hyperparameters["k"], 1.0);
    }
}
