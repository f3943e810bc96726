// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Gaussian discriminant analysis with shared (linear) or per-class (quadratic) covariance

use super::design::{CategoricalEncoding, DesignSpec};
use super::linalg::{cholesky, cholesky_solve, log_det, regularize, row_mean, scatter};
use super::{FitOptions, ModelAdapter, Predictor};
use crate::error::{EvalError, Result};
use crate::interpret::{CoefficientRow, CoefficientTable, ModelSummary, ModelSummaryBuilder};
use crate::metrics::{OutputKind, TaskType};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Relative diagonal ridge added to every covariance estimate
const COVARIANCE_RIDGE: f64 = 1e-8;

/// Row indices of class 0 and class 1
fn class_rows(y: &Array1<f64>) -> [Vec<usize>; 2] {
    let mut rows = [Vec::new(), Vec::new()];
    for (i, &v) in y.iter().enumerate() {
        rows[usize::from(v == 1.0)].push(i);
    }
    rows
}

#[derive(Debug, Clone)]
struct ClassDensity {
    mean: Array1<f64>,
    chol: Array2<f64>,
    log_prior: f64,
    /// log |Σ|; zero for the shared-covariance model where it cancels
    log_det: f64,
}

impl ClassDensity {
    fn score(&self, row: ArrayView1<'_, f64>) -> f64 {
        let diff = &row - &self.mean;
        let solved = cholesky_solve(&self.chol, diff.view());
        self.log_prior - 0.5 * self.log_det - 0.5 * diff.dot(&solved)
    }
}

/// Hard labels from the larger discriminant score; ties go to class 0
#[derive(Debug, Clone)]
struct DiscriminantPredictor {
    classes: [ClassDensity; 2],
}

impl Predictor for DiscriminantPredictor {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        x.axis_iter(Axis(0))
            .map(|row| {
                let negative = self.classes[0].score(row);
                let positive = self.classes[1].score(row);
                if positive > negative {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}

fn priors(rows: &[Vec<usize>; 2], n: usize) -> [f64; 2] {
    [rows[0].len() as f64 / n as f64, rows[1].len() as f64 / n as f64]
}

/// Shared-covariance Gaussian classifier
#[derive(Debug, Clone, Default)]
pub struct LinearDiscriminant;

impl LinearDiscriminant {
    pub fn new() -> Self {
        Self
    }
}

impl ModelAdapter for LinearDiscriminant {
    fn name(&self) -> &str {
        "LinearDiscriminant"
    }

    fn description(&self) -> &str {
        "Gaussian classes with a pooled covariance matrix"
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::Codes
    }

    fn output(&self) -> OutputKind {
        OutputKind::Label
    }

    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        _options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)> {
        let n = x.nrows();
        let rows = class_rows(y);
        let prior = priors(&rows, n);
        let means = [row_mean(x, &rows[0]), row_mean(x, &rows[1])];

        let mut pooled = scatter(x, &rows[0], &means[0]) + scatter(x, &rows[1], &means[1]);
        pooled /= (n - 2) as f64;
        regularize(&mut pooled, COVARIANCE_RIDGE);
        let chol = cholesky(&pooled)
            .ok_or_else(|| EvalError::fit(self.name(), "singular pooled covariance (collinear predictors)"))?;

        // Direction Σ⁻¹(μ₁ − μ₀) for interpretation
        let direction = cholesky_solve(&chol, (&means[1] - &means[0]).view());
        let coefficient_rows = design
            .names()
            .into_iter()
            .zip(direction.iter())
            .map(|(term, &estimate)| CoefficientRow {
                term,
                estimate,
                std_error: None,
                statistic: None,
                p_value: None,
            })
            .collect();

        let classes = [0, 1].map(|k| ClassDensity {
            mean: means[k].clone(),
            chol: chol.clone(),
            log_prior: prior[k].ln(),
            log_det: 0.0,
        });

        let summary = ModelSummaryBuilder::new(n)
            .with_coefficients(CoefficientTable {
                rows: coefficient_rows,
                statistic_name: "-".to_string(),
                residual_df: None,
            })
            .with_features_used(design.names())
            .with_hyperparameter("prior_negative", prior[0])
            .with_hyperparameter("prior_positive", prior[1])
            .with_note("coefficients are the discriminant direction, not effect sizes")
            .build();

        Ok((Box::new(DiscriminantPredictor { classes }), summary))
    }
}

/// Per-class covariance Gaussian classifier
#[derive(Debug, Clone, Default)]
pub struct QuadraticDiscriminant;

impl QuadraticDiscriminant {
    pub fn new() -> Self {
        Self
    }
}

impl ModelAdapter for QuadraticDiscriminant {
    fn name(&self) -> &str {
        "QuadraticDiscriminant"
    }

    fn description(&self) -> &str {
        "Gaussian classes with separate covariance matrices"
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::Codes
    }

    fn output(&self) -> OutputKind {
        OutputKind::Label
    }

    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        _options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)> {
        let n = x.nrows();
        let p = x.ncols();
        let rows = class_rows(y);
        let prior = priors(&rows, n);

        let mut densities = Vec::with_capacity(2);
        for (k, class) in rows.iter().enumerate() {
            if class.len() <= p {
                return Err(EvalError::fit(
                    self.name(),
                    format!("class {} has {} rows for {} predictors", k, class.len(), p),
                ));
            }
            let mean = row_mean(x, class);
            let mut cov = scatter(x, class, &mean);
            cov /= (class.len() - 1) as f64;
            regularize(&mut cov, COVARIANCE_RIDGE);
            let chol = cholesky(&cov)
                .ok_or_else(|| EvalError::fit(self.name(), format!("singular covariance in class {}", k)))?;
            densities.push(ClassDensity {
                mean,
                log_det: log_det(&chol),
                chol,
                log_prior: prior[k].ln(),
            });
        }
        let positive = densities.pop();
        let negative = densities.pop();
        let (Some(negative), Some(positive)) = (negative, positive) else {
            return Err(EvalError::fit(self.name(), "expected two classes"));
        };

        let summary = ModelSummaryBuilder::new(n)
            .with_features_used(design.names())
            .with_hyperparameter("prior_negative", prior[0])
            .with_hyperparameter("prior_positive", prior[1])
            .with_hyperparameter("log_det_negative", negative.log_det)
            .with_hyperparameter("log_det_positive", positive.log_det)
            .build();

        Ok((
            Box::new(DiscriminantPredictor {
                classes: [negative, positive],
            }),
            summary,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{accuracy, majority_rate, synthetic_dataset};
    use super::*;
    use crate::features::{model_schema, ModelDataset};

    /// Two well-separated clouds along speechiness
    fn separated(n: usize) -> ModelDataset {
        let schema = model_schema();
        let explicit = schema.iter().position(|c| c.name == "explicit").unwrap();
        let speech = schema.iter().position(|c| c.name == "speechiness").unwrap();
        let data = Array2::from_shape_fn((n, schema.len()), |(i, j)| {
            let positive = i % 2 == 1;
            let jitter = ((i * 7 + j * 13) % 17) as f64 / 17.0;
            match j {
                _ if j == explicit => f64::from(u8::from(positive)),
                _ if j == speech => (if positive { 0.8 } else { 0.1 }) + 0.05 * jitter,
                _ => 1.0 + jitter + (i % 5) as f64 * 0.1 * (j + 1) as f64,
            }
        });
        ModelDataset::new((0..n).map(|i| format!("r{}", i)).collect(), schema, data).unwrap()
    }

    #[test]
    fn test_lda_separates_clouds() {
        let data = separated(80);
        let adapter = LinearDiscriminant::new();
        let fitted = adapter.fit(&data, "explicit", &FitOptions::default()).unwrap();
        let predicted = adapter.predict(&fitted, &data).unwrap();

        assert_eq!(predicted.kind, OutputKind::Label);
        let truth = data.column("explicit").unwrap().to_vec();
        assert_eq!(accuracy(&truth, &predicted.values, 0.5), 1.0);
    }

    #[test]
    fn test_qda_labels_are_binary() {
        let data = synthetic_dataset(500, 12);
        let adapter = QuadraticDiscriminant::new();
        let fitted = adapter.fit(&data, "explicit", &FitOptions::default()).unwrap();
        let predicted = adapter.predict(&fitted, &data).unwrap();

        assert!(predicted.values.iter().all(|&v| v == 0.0 || v == 1.0));
        let truth = data.column("explicit").unwrap().to_vec();
        assert!(accuracy(&truth, &predicted.values, 0.5) > majority_rate(&truth) - 0.1);
    }

    #[test]
    fn test_qda_small_class_is_fit_error() {
        // 15 rows per class against 15 predictors
        let data = separated(30);
        let result = QuadraticDiscriminant::new().fit(&data, "explicit", &FitOptions::default());
        assert!(matches!(result, Err(EvalError::Fit { .. })));
    }
}
