// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Design-matrix recipes: categorical encoding, constant-column removal and
//! optional standardization, learned on training rows only

use crate::error::{EvalError, Result};
use crate::features::{ColumnKind, ModelDataset};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// How categorical predictors enter a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoricalEncoding {
    /// Drop-first indicator columns over the levels seen in training
    OneHot,
    /// The integer code used directly as a numeric column
    Codes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scaling {
    None,
    /// Center and scale continuous predictors; leave categorical columns untouched
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Source {
    Value,
    Indicator(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignColumn {
    pub name: String,
    pub source_column: String,
    source: Source,
    pub continuous: bool,
    center: f64,
    scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedColumn {
    pub column: String,
    pub reason: String,
}

/// Column recipe learned from a training table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSpec {
    target: String,
    encoding: CategoricalEncoding,
    columns: Vec<DesignColumn>,
    dropped: Vec<DroppedColumn>,
}

impl DesignSpec {
    pub fn learn(train: &ModelDataset, target: &str, encoding: CategoricalEncoding, scaling: Scaling) -> Self {
        let mut columns = Vec::new();
        let mut dropped = Vec::new();

        for spec in train.predictors(target) {
            let Some(values) = train.column(&spec.name) else {
                continue;
            };
            let (mean, sd) = mean_sd(values.iter().copied());

            match (&spec.kind, encoding) {
                (ColumnKind::Categorical { .. }, CategoricalEncoding::OneHot) => {
                    let mut seen: Vec<u8> = values.iter().map(|&v| v as u8).collect();
                    seen.sort_unstable();
                    seen.dedup();

                    if seen.len() < 2 {
                        tracing::warn!("'{}' has a single level in training; dropping", spec.name);
                        dropped.push(DroppedColumn {
                            column: spec.name.clone(),
                            reason: "single level in training data".to_string(),
                        });
                        continue;
                    }
                    for &level in &seen[1..] {
                        columns.push(DesignColumn {
                            name: format!("{}_{}", spec.name, level),
                            source_column: spec.name.clone(),
                            source: Source::Indicator(level),
                            continuous: false,
                            center: 0.0,
                            scale: 1.0,
                        });
                    }
                }
                (kind, _) => {
                    if sd == 0.0 {
                        dropped.push(DroppedColumn {
                            column: spec.name.clone(),
                            reason: "zero variance in training data".to_string(),
                        });
                        continue;
                    }
                    let continuous = !kind.is_categorical();
                    let (center, scale) = if continuous && scaling == Scaling::Continuous {
                        (mean, sd)
                    } else {
                        (0.0, 1.0)
                    };
                    columns.push(DesignColumn {
                        name: spec.name.clone(),
                        source_column: spec.name.clone(),
                        source: Source::Value,
                        continuous,
                        center,
                        scale,
                    });
                }
            }
        }

        Self {
            target: target.to_string(),
            encoding,
            columns,
            dropped,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn encoding(&self) -> CategoricalEncoding {
        self.encoding
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[DesignColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn dropped(&self) -> &[DroppedColumn] {
        &self.dropped
    }

    /// Apply the recipe to any table with the training schema.
    ///
    /// Categorical levels never seen in training encode as the reference level.
    pub fn transform(&self, rows: &ModelDataset) -> Result<Array2<f64>> {
        let sources = self
            .columns
            .iter()
            .map(|c| {
                rows.column_index(&c.source_column)
                    .ok_or_else(|| EvalError::schema(c.source_column.as_str(), "required column is missing"))
            })
            .collect::<Result<Vec<usize>>>()?;

        let data = rows.data();
        Ok(Array2::from_shape_fn((rows.n_rows(), self.width()), |(i, j)| {
            let column = &self.columns[j];
            let raw = data[[i, sources[j]]];
            match column.source {
                Source::Value => (raw - column.center) / column.scale,
                Source::Indicator(level) => {
                    if raw as u8 == level {
                        1.0
                    } else {
                        0.0
                    }
                }
            }
        }))
    }
}

/// Population mean and standard deviation
pub fn mean_sd(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return (0.0, 0.0);
    }
    let n = collected.len() as f64;
    let mean = collected.iter().sum::<f64>() / n;
    let var = collected.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Per-column mean and standard deviation of a matrix
pub fn column_stats(x: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let p = x.ncols();
    let mut means = Array1::zeros(p);
    let mut sds = Array1::zeros(p);
    for j in 0..p {
        let (m, s) = mean_sd(x.column(j).iter().copied());
        means[j] = m;
        sds[j] = s;
    }
    (means, sds)
}
