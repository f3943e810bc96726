// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Regression trees (CART) and bagged random forests

use super::design::{CategoricalEncoding, DesignSpec};
use super::{FitOptions, ModelAdapter, Predictor};
use crate::error::{EvalError, Result};
use crate::interpret::{ModelSummary, ModelSummaryBuilder};
use crate::metrics::{OutputKind, TaskType};
use crate::split::subsample;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    /// Smallest node that may be split
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Minimum SSE decrease, as a fraction of the root SSE, for a split to be kept
    pub complexity: f64,
    /// Features drawn per node; `None` considers all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 30,
            min_samples_split: 20,
            min_samples_leaf: 7,
            complexity: 0.01,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node arena
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Total SSE decrease credited to each feature
    importance: Vec<f64>,
    depth: usize,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: TreeParams,
    min_gain: f64,
    nodes: Vec<Node>,
    importance: Vec<f64>,
    depth: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn sse(y: &Array1<f64>, rows: &[usize]) -> (f64, f64) {
    let n = rows.len() as f64;
    let sum: f64 = rows.iter().map(|&i| y[i]).sum();
    let sum_sq: f64 = rows.iter().map(|&i| y[i] * y[i]).sum();
    let mean = sum / n;
    (mean, (sum_sq - sum * mean).max(0.0))
}

impl<'a> Builder<'a> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> usize {
        self.depth = self.depth.max(depth);
        let (mean, node_sse) = sse(self.y, &rows);

        let splittable = depth < self.params.max_depth
            && rows.len() >= self.params.min_samples_split
            && rows.len() >= 2 * self.params.min_samples_leaf
            && node_sse > 0.0;

        let best = if splittable {
            self.best_split(&rows, node_sse, rng)
        } else {
            None
        };

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        if let Some(split) = best.filter(|s| s.gain >= self.min_gain && s.gain > 0.0) {
            let x = self.x;
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .copied()
                .partition(|&i| x[[i, split.feature]] <= split.threshold);

            self.importance[split.feature] += split.gain;
            let left = self.grow(left_rows, depth + 1, rng);
            let right = self.grow(right_rows, depth + 1, rng);
            self.nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
        }
        id
    }

    fn best_split(&self, rows: &[usize], node_sse: f64, rng: &mut ChaCha8Rng) -> Option<BestSplit> {
        let p = self.x.ncols();
        let features: Vec<usize> = match self.params.max_features {
            Some(m) if m < p => sample(rng, p, m).into_vec(),
            _ => (0..p).collect(),
        };

        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = rows.len();
        let total_sum: f64 = rows.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = rows.iter().map(|&i| self.y[i] * self.y[i]).sum();

        let mut best: Option<BestSplit> = None;
        let mut order = rows.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| {
                self.x[[a, feature]]
                    .partial_cmp(&self.x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let yi = self.y[order[k]];
                left_sum += yi;
                left_sq += yi * yi;

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = self.x[[order[k], feature]];
                let next = self.x[[order[k + 1], feature]];
                if here == next {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / n_left as f64;
                let right_sse = right_sq - right_sum * right_sum / n_right as f64;
                let gain = node_sse - left_sse - right_sse;

                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

impl RegressionTree {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, rows: Vec<usize>, params: TreeParams, rng: &mut ChaCha8Rng) -> Self {
        let (_, root_sse) = sse(y, &rows);
        let mut builder = Builder {
            x,
            y,
            params,
            min_gain: params.complexity * root_sse,
            nodes: Vec::new(),
            importance: vec![0.0; x.ncols()],
            depth: 0,
        };
        builder.grow(rows, 0, rng);
        Self {
            nodes: builder.nodes,
            importance: builder.importance,
            depth: builder.depth,
        }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    /// Indices of features used in at least one split
    pub fn split_features(&self) -> BTreeSet<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .collect()
    }
}

impl Predictor for RegressionTree {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        x.axis_iter(Axis(0)).map(|row| self.predict_row(row)).collect()
    }
}

/// Single CART regression tree
#[derive(Debug, Clone, Default)]
pub struct DecisionTree {
    params: TreeParams,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: TreeParams) -> Self {
        Self { params }
    }
}

impl ModelAdapter for DecisionTree {
    fn name(&self) -> &str {
        "DecisionTree"
    }

    fn description(&self) -> &str {
        "CART regression tree with variance-reduction splits"
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::Codes
    }

    fn output(&self) -> OutputKind {
        OutputKind::Continuous
    }

    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)> {
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let tree = RegressionTree::fit(x, y, (0..x.nrows()).collect(), self.params, &mut rng);

        let names = design.names();
        let used: Vec<String> = tree.split_features().into_iter().map(|j| names[j].clone()).collect();
        let importance = names.iter().cloned().zip(tree.importance().iter().copied()).collect();

        let summary = ModelSummaryBuilder::new(x.nrows())
            .with_features_used(used)
            .with_importance(importance)
            .with_hyperparameter("leaves", tree.n_leaves() as f64)
            .with_hyperparameter("depth", tree.depth() as f64)
            .with_hyperparameter("min_samples_split", self.params.min_samples_split as f64)
            .with_hyperparameter("min_samples_leaf", self.params.min_samples_leaf as f64)
            .with_hyperparameter("complexity", self.params.complexity)
            .build();

        Ok((Box::new(tree), summary))
    }
}

#[derive(Debug, Clone)]
struct Forest {
    trees: Vec<RegressionTree>,
}

impl Predictor for Forest {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        let n_trees = self.trees.len() as f64;
        x.axis_iter(Axis(0))
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect()
    }
}

/// Bagged regression trees with random feature subsets at each node
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_trees: usize,
}

impl RandomForest {
    pub fn new(n_trees: usize) -> Self {
        Self {
            n_trees: n_trees.max(1),
        }
    }
}

impl ModelAdapter for RandomForest {
    fn name(&self) -> &str {
        "RandomForest"
    }

    fn description(&self) -> &str {
        "Bootstrap-aggregated regression trees with impurity-based importance"
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::Codes
    }

    fn output(&self) -> OutputKind {
        OutputKind::Continuous
    }

    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)> {
        let picked = subsample(x.nrows(), options.max_train_rows, options.seed);
        let x = x.select(Axis(0), &picked);
        let y = y.select(Axis(0), &picked);
        let n = x.nrows();
        if n == 0 {
            return Err(EvalError::fit(self.name(), "empty training subsample"));
        }

        let p = x.ncols();
        let params = TreeParams {
            max_depth: 30,
            min_samples_split: 10,
            min_samples_leaf: 5,
            complexity: 0.0,
            max_features: Some((p / 3).max(1)),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let trees: Vec<RegressionTree> = (0..self.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(&x, &y, bootstrap, params, &mut rng)
            })
            .collect();

        let mut importance = vec![0.0; p];
        for tree in &trees {
            for (total, v) in importance.iter_mut().zip(tree.importance()) {
                *total += v;
            }
        }
        let names = design.names();
        let used: Vec<String> = names
            .iter()
            .zip(&importance)
            .filter(|(_, &v)| v > 0.0)
            .map(|(n, _)| n.clone())
            .collect();

        let summary = ModelSummaryBuilder::new(n)
            .with_importance(names.into_iter().zip(importance).collect())
            .with_features_used(used)
            .with_hyperparameter("trees", self.n_trees as f64)
            .with_hyperparameter("max_features", params.max_features.unwrap_or(p) as f64)
            .with_hyperparameter("min_samples_leaf", params.min_samples_leaf as f64)
            .build();

        tracing::debug!("{}: grew {} trees on {} rows", self.name(), self.n_trees, n);
        Ok((Box::new(Forest { trees }), summary))
    }
}
