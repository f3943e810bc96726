// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Logistic regression fitted by iteratively reweighted least squares

use super::design::{CategoricalEncoding, DesignSpec};
use super::linalg::{cholesky, cholesky_inverse, cholesky_solve, with_intercept};
use super::linear::INTERCEPT;
use super::{FitOptions, ModelAdapter, Predictor};
use crate::error::{EvalError, Result};
use crate::interpret::{normal_p_value, CoefficientRow, CoefficientTable, ModelSummary, ModelSummaryBuilder};
use crate::metrics::{OutputKind, TaskType};
use ndarray::{s, Array1, Array2};

const MAX_ITERATIONS: usize = 50;
const DEVIANCE_TOLERANCE: f64 = 1e-8;
/// Keeps IRLS weights away from zero under near-separation
const MIN_WEIGHT: f64 = 1e-10;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn deviance(y: &Array1<f64>, mu: &Array1<f64>) -> f64 {
    -2.0 * y
        .iter()
        .zip(mu.iter())
        .map(|(&yi, &p)| {
            let p = p.clamp(1e-15, 1.0 - 1e-15);
            yi * p.ln() + (1.0 - yi) * (1.0 - p).ln()
        })
        .sum::<f64>()
}

/// Outputs P(y = 1)
#[derive(Debug, Clone)]
struct LogisticPredictor {
    intercept: f64,
    coefficients: Array1<f64>,
}

impl Predictor for LogisticPredictor {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        (x.dot(&self.coefficients) + self.intercept).mapv(sigmoid).to_vec()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogisticRegression;

impl LogisticRegression {
    pub fn new() -> Self {
        Self
    }
}

impl ModelAdapter for LogisticRegression {
    fn name(&self) -> &str {
        "LogisticRegression"
    }

    fn description(&self) -> &str {
        "Binomial GLM with logit link; outputs P(positive) and Wald tests"
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::OneHot
    }

    fn output(&self) -> OutputKind {
        OutputKind::Probability
    }

    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        _options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)> {
        let x1 = with_intercept(x);
        let n = x1.nrows();
        let p = x1.ncols();

        let mut beta = Array1::<f64>::zeros(p);
        let mut previous = f64::INFINITY;
        let mut converged = false;
        let mut iterations = 0;
        let mut factor = None;

        for _ in 0..MAX_ITERATIONS {
            iterations += 1;
            let eta = x1.dot(&beta);
            let mu = eta.mapv(sigmoid);
            let w = mu.mapv(|m| (m * (1.0 - m)).max(MIN_WEIGHT));

            // working response z = eta + (y - mu) / w
            let z = &eta + &((y - &mu) / &w);
            let xw = &x1 * &w.view().insert_axis(ndarray::Axis(1));
            let xtwx = xw.t().dot(&x1);
            let xtwz = xw.t().dot(&z);

            let l = cholesky(&xtwx)
                .ok_or_else(|| EvalError::fit(self.name(), "singular information matrix (collinear predictors)"))?;
            beta = cholesky_solve(&l, xtwz.view());
            factor = Some(l);

            let dev = deviance(y, &x1.dot(&beta).mapv(sigmoid));
            if !dev.is_finite() {
                return Err(EvalError::fit(self.name(), "deviance diverged"));
            }
            if (previous - dev).abs() < DEVIANCE_TOLERANCE * (dev.abs() + 0.1) {
                converged = true;
                break;
            }
            previous = dev;
        }

        // Wald standard errors from the information matrix at the final estimate
        let mu = x1.dot(&beta).mapv(sigmoid);
        let w = mu.mapv(|m| (m * (1.0 - m)).max(MIN_WEIGHT));
        let xw = &x1 * &w.view().insert_axis(ndarray::Axis(1));
        let information = xw.t().dot(&x1);
        let inverse = cholesky(&information)
            .or(factor)
            .map(|l| cholesky_inverse(&l))
            .ok_or_else(|| EvalError::fit(self.name(), "singular information matrix"))?;

        let mut terms = vec![INTERCEPT.to_string()];
        terms.extend(design.names());
        let rows = terms
            .into_iter()
            .enumerate()
            .map(|(j, term)| {
                let se = inverse[[j, j]].max(0.0).sqrt();
                let z = (se > 0.0).then(|| beta[j] / se);
                CoefficientRow {
                    term,
                    estimate: beta[j],
                    std_error: Some(se),
                    statistic: z,
                    p_value: z.map(normal_p_value),
                }
            })
            .collect();

        let final_deviance = deviance(y, &mu);
        let mut builder = ModelSummaryBuilder::new(n)
            .with_coefficients(CoefficientTable {
                rows,
                statistic_name: "z".to_string(),
                residual_df: Some(n.saturating_sub(p)),
            })
            .with_features_used(design.names())
            .with_hyperparameter("iterations", iterations as f64)
            .with_hyperparameter("deviance", final_deviance);
        if !converged {
            tracing::warn!("{}: IRLS stopped after {} iterations without converging", self.name(), iterations);
            builder = builder.with_note("IRLS did not converge; classes may be separable");
        }

        let predictor = LogisticPredictor {
            intercept: beta[0],
            coefficients: beta.slice(s![1..]).to_owned(),
        };
        Ok((Box::new(predictor), builder.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{accuracy, majority_rate, synthetic_dataset};
    use super::*;

    #[test]
    fn test_probabilities_in_unit_interval() {
        let data = synthetic_dataset(400, 17);
        let adapter = LogisticRegression::new();
        let fitted = adapter.fit(&data, "explicit", &FitOptions::default()).unwrap();
        let predictions = adapter.predict(&fitted, &data).unwrap();

        assert_eq!(predictions.kind, OutputKind::Probability);
        assert!(predictions.values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_speechiness_is_positive_and_significant() {
        let data = synthetic_dataset(600, 3);
        let adapter = LogisticRegression::new();
        let fitted = adapter.fit(&data, "explicit", &FitOptions::default()).unwrap();

        let table = fitted.summary().coefficients.as_ref().unwrap();
        assert_eq!(table.statistic_name, "z");
        let speech = table.get("speechiness").unwrap();
        assert!(speech.estimate > 0.0);
        assert!(speech.p_value.unwrap() < 0.01);

        let truth = data.column("explicit").unwrap().to_vec();
        let predicted = adapter.predict(&fitted, &data).unwrap().values;
        assert!(accuracy(&truth, &predicted, 0.5) >= majority_rate(&truth));
    }
}
