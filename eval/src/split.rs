// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Seeded row partitioning: train/test splits, subsamples and K-fold folds
//!
//! Every routine takes its seed explicitly; nothing reads ambient randomness.

use crate::error::{EvalError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Fixed train/test partition of row indices.
///
/// Built once per run and shared read-only by every adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    train: Vec<usize>,
    test: Vec<usize>,
    seed: u64,
}

impl Split {
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    pub fn test(&self) -> &[usize] {
        &self.test
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }
}

pub struct DatasetSplitter;

impl DatasetSplitter {
    /// Shuffle `0..n_rows` with `seed` and take the first `floor(fraction * n)` as train
    pub fn split(n_rows: usize, train_fraction: f64, seed: u64) -> Result<Split> {
        validate_fraction(train_fraction)?;

        let mut indices: Vec<usize> = (0..n_rows).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_train = (train_fraction * n_rows as f64).floor() as usize;
        let test = indices.split_off(n_train);

        tracing::debug!("Split {} rows: train={}, test={} (seed={})", n_rows, n_train, test.len(), seed);

        Ok(Split {
            train: indices,
            test,
            seed,
        })
    }

    /// Split a subset of indices (e.g. the training rows) into two disjoint parts
    pub fn split_indices(indices: &[usize], first_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
        validate_fraction(first_fraction)?;

        let mut shuffled = indices.to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        shuffled.shuffle(&mut rng);

        let n_first = (first_fraction * indices.len() as f64).floor() as usize;
        let second = shuffled.split_off(n_first);
        Ok((shuffled, second))
    }
}

pub fn validate_fraction(fraction: f64) -> Result<()> {
    if fraction > 0.0 && fraction < 1.0 {
        Ok(())
    } else {
        Err(EvalError::InvalidFraction(fraction))
    }
}

/// Draw at most `max_rows` positions from `0..n` without replacement.
///
/// Returns every position, in order, when `n <= max_rows`.
pub fn subsample(n: usize, max_rows: usize, seed: u64) -> Vec<usize> {
    if n <= max_rows {
        return (0..n).collect();
    }
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(max_rows);
    indices.sort_unstable();
    indices
}

/// K-fold partitioner over `0..n_samples`
#[derive(Clone, Debug)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self {
            n_splits: n_splits.max(2),
            seed,
        }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// (train, validation) position lists for each fold.
    ///
    /// The first `n % k` folds get one extra row.
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;

        for i in 0..self.n_splits {
            let extra = usize::from(i < remainder);
            let end = start + fold_size + extra;

            let validation: Vec<usize> = indices[start..end].to_vec();
            let train: Vec<usize> = indices[..start]
                .iter()
                .chain(indices[end..].iter())
                .copied()
                .collect();

            folds.push((train, validation));
            start = end;
        }

        folds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes() {
        let split = DatasetSplitter::split(100, 0.8, 42).unwrap();
        assert_eq!(split.train().len(), 80);
        assert_eq!(split.test().len(), 20);

        let split = DatasetSplitter::split(7, 0.8, 42).unwrap();
        assert_eq!(split.train().len(), 5);
        assert_eq!(split.test().len(), 2);
    }

    #[test]
    fn test_invalid_fraction() {
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(matches!(
                DatasetSplitter::split(10, bad, 1),
                Err(EvalError::InvalidFraction(_))
            ));
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = DatasetSplitter::split(200, 0.8, 1).unwrap();
        let b = DatasetSplitter::split(200, 0.8, 2).unwrap();
        assert_ne!(a.train(), b.train());
    }

    #[test]
    fn test_subsample() {
        assert_eq!(subsample(5, 10, 3), vec![0, 1, 2, 3, 4]);

        let picked = subsample(100, 10, 3);
        assert_eq!(picked.len(), 10);
        assert_eq!(picked, subsample(100, 10, 3));
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_kfold_covers_every_row_once() {
        let folds = KFold::new(5, 11).split(23);
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0usize; 23];
        for (train, validation) in &folds {
            assert_eq!(train.len() + validation.len(), 23);
            for &i in validation {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
        assert_eq!(folds[0].1.len(), 5);
        assert_eq!(folds[4].1.len(), 4);
    }

    #[test]
    fn test_split_indices_partition() {
        let base: Vec<usize> = (100..150).collect();
        let (a, b) = DatasetSplitter::split_indices(&base, 0.8, 5).unwrap();
        assert_eq!(a.len(), 40);
        assert_eq!(b.len(), 10);

        let union: HashSet<usize> = a.iter().chain(b.iter()).copied().collect();
        assert_eq!(union, base.iter().copied().collect());
    }

    proptest! {
        #[test]
        fn prop_split_is_deterministic_disjoint_and_exhaustive(n in 0usize..500, seed in any::<u64>()) {
            let first = DatasetSplitter::split(n, DEFAULT_TRAIN_FRACTION, seed).unwrap();
            let second = DatasetSplitter::split(n, DEFAULT_TRAIN_FRACTION, seed).unwrap();
            prop_assert_eq!(&first, &second);

            let train: HashSet<usize> = first.train().iter().copied().collect();
            let test: HashSet<usize> = first.test().iter().copied().collect();
            prop_assert!(train.is_disjoint(&test));
            prop_assert_eq!(train.len() + test.len(), n);
            prop_assert!(train.iter().chain(test.iter()).all(|&i| i < n));
            prop_assert_eq!(first.train().len(), (0.8 * n as f64).floor() as usize);
        }
    }
}
