// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Ordinary least squares and cross-validated lasso

use super::design::{column_stats, CategoricalEncoding, DesignSpec};
use super::linalg::{cholesky, cholesky_inverse, cholesky_solve, with_intercept};
use super::{FitOptions, ModelAdapter, Predictor};
use crate::error::{EvalError, Result};
use crate::interpret::{student_t_p_value, CoefficientRow, CoefficientTable, ModelSummary, ModelSummaryBuilder};
use crate::metrics::{OutputKind, TaskType};
use crate::split::KFold;
use ndarray::{Array1, Array2, Axis};

pub(crate) const INTERCEPT: &str = "(intercept)";

/// `intercept + x · coefficients`
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    pub intercept: f64,
    pub coefficients: Array1<f64>,
}

impl LinearPredictor {
    pub fn score(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

impl Predictor for LinearPredictor {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        self.score(x).to_vec()
    }
}

/// OLS with a full inferential coefficient table
#[derive(Debug, Clone, Default)]
pub struct LinearRegression;

impl LinearRegression {
    pub fn new() -> Self {
        Self
    }
}

impl ModelAdapter for LinearRegression {
    fn name(&self) -> &str {
        "LinearRegression"
    }

    fn description(&self) -> &str {
        "Ordinary least squares with t-tests on every coefficient"
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::OneHot
    }

    fn output(&self) -> OutputKind {
        OutputKind::Continuous
    }

    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        _options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)> {
        let x1 = with_intercept(x);
        let xtx = x1.t().dot(&x1);
        let xty = x1.t().dot(y);

        let l = cholesky(&xtx)
            .ok_or_else(|| EvalError::fit(self.name(), "singular design matrix (collinear predictors)"))?;
        let beta = cholesky_solve(&l, xty.view());

        let residuals = y - &x1.dot(&beta);
        let rss = residuals.dot(&residuals);
        let n = x1.nrows();
        let p = x1.ncols();
        let df = n.saturating_sub(p);

        let std_errors: Option<Array1<f64>> = (df > 0).then(|| {
            let sigma2 = rss / df as f64;
            let inv = cholesky_inverse(&l);
            inv.diag().mapv(|v| (sigma2 * v).sqrt())
        });

        let mut terms = vec![INTERCEPT.to_string()];
        terms.extend(design.names());

        let rows = terms
            .into_iter()
            .enumerate()
            .map(|(j, term)| {
                let se = std_errors.as_ref().map(|s| s[j]);
                let t = se.filter(|&s| s > 0.0).map(|s| beta[j] / s);
                CoefficientRow {
                    term,
                    estimate: beta[j],
                    std_error: se,
                    statistic: t,
                    p_value: t.map(|t| student_t_p_value(t, df as f64)),
                }
            })
            .collect();

        let tss = {
            let mean = y.mean().unwrap_or(0.0);
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        };
        let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

        let summary = ModelSummaryBuilder::new(n)
            .with_coefficients(CoefficientTable {
                rows,
                statistic_name: "t".to_string(),
                residual_df: Some(df),
            })
            .with_features_used(design.names())
            .with_hyperparameter("r_squared", r_squared)
            .with_hyperparameter("residual_standard_error", (rss / df.max(1) as f64).sqrt())
            .build();

        let predictor = LinearPredictor {
            intercept: beta[0],
            coefficients: beta.slice(ndarray::s![1..]).to_owned(),
        };
        Ok((Box::new(predictor), summary))
    }
}

/// Penalty path length
const LAMBDA_COUNT: usize = 40;
/// Smallest penalty as a fraction of the largest
const LAMBDA_MIN_RATIO: f64 = 1e-3;
const CD_TOLERANCE: f64 = 1e-7;
const CD_MAX_SWEEPS: usize = 1000;

/// L1-penalized least squares with the penalty chosen by K-fold CV
#[derive(Debug, Clone, Default)]
pub struct LassoRegression;

impl LassoRegression {
    pub fn new() -> Self {
        Self
    }
}

/// Standardized copy of a design with the statistics needed to undo it
struct Standardized {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Array1<f64>,
    x_sd: Array1<f64>,
    y_mean: f64,
}

impl Standardized {
    fn new(x: &Array2<f64>, y: &Array1<f64>) -> Self {
        let (x_mean, mut x_sd) = column_stats(x);
        x_sd.mapv_inplace(|s| if s > 0.0 { s } else { 1.0 });
        let y_mean = y.mean().unwrap_or(0.0);
        Self {
            x: (x - &x_mean) / &x_sd,
            y: y - y_mean,
            x_mean,
            x_sd,
            y_mean,
        }
    }

    /// Back to the original scale
    fn unscale(&self, beta: &Array1<f64>) -> LinearPredictor {
        let coefficients = beta / &self.x_sd;
        let intercept = self.y_mean - coefficients.dot(&self.x_mean);
        LinearPredictor {
            intercept,
            coefficients,
        }
    }
}

fn soft_threshold(value: f64, lambda: f64) -> f64 {
    if value > lambda {
        value - lambda
    } else if value < -lambda {
        value + lambda
    } else {
        0.0
    }
}

/// Coordinate descent for (1/2n)‖y − Xβ‖² + λ‖β‖₁, warm-started from `beta`
fn coordinate_descent(x: &Array2<f64>, y: &Array1<f64>, lambda: f64, beta: &mut Array1<f64>) {
    let n = x.nrows() as f64;
    let col_sq: Vec<f64> = x.axis_iter(Axis(1)).map(|c| c.dot(&c) / n).collect();
    let mut residual = y - &x.dot(beta);

    for _ in 0..CD_MAX_SWEEPS {
        let mut max_change = 0.0_f64;
        for j in 0..x.ncols() {
            if col_sq[j] == 0.0 {
                continue;
            }
            let xj = x.column(j);
            let old = beta[j];
            let rho = xj.dot(&residual) / n + col_sq[j] * old;
            let new = soft_threshold(rho, lambda) / col_sq[j];
            if new != old {
                residual.scaled_add(old - new, &xj);
                beta[j] = new;
                max_change = max_change.max((new - old).abs());
            }
        }
        if max_change < CD_TOLERANCE {
            break;
        }
    }
}

fn lambda_grid(x: &Array2<f64>, y: &Array1<f64>) -> Vec<f64> {
    let n = x.nrows() as f64;
    let lambda_max = x
        .axis_iter(Axis(1))
        .map(|c| (c.dot(y) / n).abs())
        .fold(0.0_f64, f64::max)
        .max(1e-8);
    let ratio = LAMBDA_MIN_RATIO.powf(1.0 / (LAMBDA_COUNT - 1) as f64);
    (0..LAMBDA_COUNT).map(|i| lambda_max * ratio.powi(i as i32)).collect()
}

/// Fit the whole path, returning the coefficients at each penalty
fn lasso_path(x: &Array2<f64>, y: &Array1<f64>, lambdas: &[f64]) -> Vec<Array1<f64>> {
    let mut beta = Array1::zeros(x.ncols());
    lambdas
        .iter()
        .map(|&lambda| {
            coordinate_descent(x, y, lambda, &mut beta);
            beta.clone()
        })
        .collect()
}

impl ModelAdapter for LassoRegression {
    fn name(&self) -> &str {
        "LassoRegression"
    }

    fn description(&self) -> &str {
        "L1-penalized least squares, penalty chosen by K-fold cross-validation"
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::OneHot
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
        let full = Standardized::new(x, y);
        let lambdas = lambda_grid(&full.x, &full.y);

        let kfold = KFold::new(options.cv_folds, options.seed);
        let mut cv_error = vec![0.0; lambdas.len()];
        for (train_rows, validation_rows) in kfold.split(x.nrows()) {
            let fold = Standardized::new(&x.select(Axis(0), &train_rows), &y.select(Axis(0), &train_rows));
            let x_val = x.select(Axis(0), &validation_rows);
            let y_val = y.select(Axis(0), &validation_rows);

            for (k, beta) in lasso_path(&fold.x, &fold.y, &lambdas).iter().enumerate() {
                let predicted = fold.unscale(beta).score(&x_val);
                let sse: f64 = (&y_val - &predicted).mapv(|e| e * e).sum();
                cv_error[k] += sse / x.nrows() as f64;
            }
        }

        let (best, best_error) = cv_error
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |acc, (k, e)| if e < acc.1 { (k, e) } else { acc });
        for (lambda, error) in lambdas.iter().zip(&cv_error) {
            tracing::debug!("{}: lambda={:.6} cv_mse={:.4}", self.name(), lambda, error);
        }

        let path = lasso_path(&full.x, &full.y, &lambdas[..=best]);
        let beta = path
            .last()
            .cloned()
            .ok_or_else(|| EvalError::fit(self.name(), "empty penalty path"))?;
        let predictor = full.unscale(&beta);

        let names = design.names();
        let kept: Vec<String> = names
            .iter()
            .zip(predictor.coefficients.iter())
            .filter(|(_, &b)| b != 0.0)
            .map(|(n, _)| n.clone())
            .collect();
        let zeroed: Vec<String> = names
            .iter()
            .zip(predictor.coefficients.iter())
            .filter(|(_, &b)| b == 0.0)
            .map(|(n, _)| n.clone())
            .collect();
        let keeps_all = best == lambdas.len() - 1;

        let mut rows = vec![CoefficientRow {
            term: INTERCEPT.to_string(),
            estimate: predictor.intercept,
            std_error: None,
            statistic: None,
            p_value: None,
        }];
        rows.extend(names.iter().zip(predictor.coefficients.iter()).map(|(term, &b)| CoefficientRow {
            term: term.clone(),
            estimate: b,
            std_error: None,
            statistic: None,
            p_value: None,
        }));

        let mut builder = ModelSummaryBuilder::new(x.nrows())
            .with_coefficients(CoefficientTable {
                rows,
                statistic_name: "t".to_string(),
                residual_df: None,
            })
            .with_hyperparameter("lambda", lambdas[best])
            .with_hyperparameter("cv_mse", best_error)
            .with_hyperparameter("cv_folds", kfold.n_splits() as f64)
            .with_hyperparameter("predictors_kept", kept.len() as f64)
            .with_features_used(kept);
        if !zeroed.is_empty() {
            builder = builder.with_note(format!("zeroed by the penalty: {}", zeroed.join(", ")));
        }
        if keeps_all {
            builder = builder.with_note("smallest penalty in the grid won: lasso keeps all predictors");
        }

        Ok((Box::new(predictor), builder.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::synthetic_dataset;
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ols_recovers_year_slope() {
        let data = synthetic_dataset(400, 21);
        let fitted = LinearRegression::new()
            .fit(&data, "popularity", &FitOptions::default())
            .unwrap();

        let table = fitted.summary().coefficients.as_ref().unwrap();
        let year = table.get("year").unwrap();
        assert!((year.estimate - 0.5).abs() < 0.03, "slope {}", year.estimate);
        assert!(year.p_value.unwrap() < 1e-10);
        assert_eq!(table.rows.len(), fitted.design().width() + 1);
    }

    #[test]
    fn test_collinear_design_is_fit_error() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0], [5.0, 10.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let data = synthetic_dataset(5, 1);
        let design = DesignSpec::learn(&data, "popularity", CategoricalEncoding::OneHot, super::super::Scaling::None);

        let result = LinearRegression::new().fit_design(&x, &y, &design, &FitOptions::default());
        assert!(matches!(result, Err(EvalError::Fit { .. })));
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }

    #[test]
    fn test_lasso_keeps_strong_signal_and_reports_penalty() {
        let data = synthetic_dataset(300, 8);
        let fitted = LassoRegression::new()
            .fit(&data, "popularity", &FitOptions::default())
            .unwrap();
        let summary = fitted.summary();

        assert!(summary.hyperparameters["lambda"] > 0.0);
        assert!(summary.features_used.contains(&"year".to_string()));
        let year = summary.coefficients.as_ref().unwrap().get("year").unwrap();
        assert!((year.estimate - 0.5).abs() < 0.05, "slope {}", year.estimate);
    }

    #[test]
    fn test_lasso_path_shrinks_to_zero_at_lambda_max() {
        let x = array![[1.0, 0.0], [-1.0, 0.5], [0.5, -1.0], [-0.5, 0.5]];
        let y = array![2.0, -2.0, 1.0, -1.0];
        let lambdas = lambda_grid(&x, &y);
        let path = lasso_path(&x, &y, &lambdas);

        assert!(path[0].iter().all(|&b| b.abs() < 1e-12));
        assert!(path.last().unwrap().iter().any(|&b| b != 0.0));
    }
}
