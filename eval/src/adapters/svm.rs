// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Soft-margin support vector classifiers trained by simplified SMO
//!
//! Hyperparameters are chosen by K-fold grid search on a seeded tuning
//! subsample; the final model trains on at most `max_train_rows` rows.

use super::design::{CategoricalEncoding, DesignSpec, Scaling};
use super::linear::INTERCEPT;
use super::{FitOptions, ModelAdapter, Predictor};
use crate::error::{EvalError, Result};
use crate::interpret::{CoefficientRow, CoefficientTable, ModelSummary, ModelSummaryBuilder};
use crate::metrics::{OutputKind, TaskType};
use crate::split::{subsample, KFold};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const COST_GRID: [f64; 3] = [0.1, 1.0, 10.0];
/// Multiples of 1 / n_features tried for the polynomial kernel
const GAMMA_SCALES: [f64; 3] = [0.5, 1.0, 2.0];
/// Rows used for the grid search
const TUNING_ROWS: usize = 400;
const KKT_TOLERANCE: f64 = 1e-3;
const MAX_CLEAN_PASSES: usize = 5;
const MAX_SWEEPS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SvmKernel {
    Linear,
    Polynomial { degree: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct KernelFn {
    kernel: SvmKernel,
    gamma: f64,
}

impl KernelFn {
    fn eval(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let dot = a.dot(&b);
        match self.kernel {
            SvmKernel::Linear => dot,
            SvmKernel::Polynomial { degree } => (self.gamma * dot + 1.0).powi(degree as i32),
        }
    }

    fn gram(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let v = self.eval(x.row(i), x.row(j));
                k[[i, j]] = v;
                k[[j, i]] = v;
            }
        }
        k
    }
}

/// Decision function `Σ coef_s K(s, x) + b`
#[derive(Debug, Clone)]
struct SvmModel {
    support: Array2<f64>,
    coef: Vec<f64>,
    bias: f64,
    kernel: KernelFn,
}

impl SvmModel {
    fn decision(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.support
            .axis_iter(Axis(0))
            .zip(&self.coef)
            .map(|(s, c)| c * self.kernel.eval(s, row))
            .sum::<f64>()
            + self.bias
    }
}

impl Predictor for SvmModel {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        x.axis_iter(Axis(0))
            .map(|row| if self.decision(row) > 0.0 { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Simplified SMO on a precomputed Gram matrix; `y` holds ±1
fn smo(gram: &Array2<f64>, y: &[f64], cost: f64, rng: &mut ChaCha8Rng) -> (Vec<f64>, f64) {
    let n = y.len();
    let mut alpha = vec![0.0; n];
    let mut bias = 0.0;
    // f[k] = Σ α_j y_j K[j, k] + b
    let mut f = vec![0.0; n];

    let mut clean_passes = 0;
    let mut sweeps = 0;
    while clean_passes < MAX_CLEAN_PASSES && sweeps < MAX_SWEEPS && n > 1 {
        sweeps += 1;
        let mut changed = 0;

        for i in 0..n {
            let e_i = f[i] - y[i];
            let violates = (y[i] * e_i < -KKT_TOLERANCE && alpha[i] < cost)
                || (y[i] * e_i > KKT_TOLERANCE && alpha[i] > 0.0);
            if !violates {
                continue;
            }

            let mut j = rng.gen_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            let e_j = f[j] - y[j];
            let (a_i, a_j) = (alpha[i], alpha[j]);

            let (low, high) = if y[i] != y[j] {
                ((a_j - a_i).max(0.0), (cost + a_j - a_i).min(cost))
            } else {
                ((a_i + a_j - cost).max(0.0), (a_i + a_j).min(cost))
            };
            if low >= high {
                continue;
            }

            let eta = 2.0 * gram[[i, j]] - gram[[i, i]] - gram[[j, j]];
            if eta >= 0.0 {
                continue;
            }

            let new_j = (a_j - y[j] * (e_i - e_j) / eta).clamp(low, high);
            if (new_j - a_j).abs() < 1e-5 {
                continue;
            }
            let new_i = a_i + y[i] * y[j] * (a_j - new_j);

            let d_i = y[i] * (new_i - a_i);
            let d_j = y[j] * (new_j - a_j);
            let b1 = bias - e_i - d_i * gram[[i, i]] - d_j * gram[[i, j]];
            let b2 = bias - e_j - d_i * gram[[i, j]] - d_j * gram[[j, j]];
            let new_bias = if new_i > 0.0 && new_i < cost {
                b1
            } else if new_j > 0.0 && new_j < cost {
                b2
            } else {
                (b1 + b2) / 2.0
            };

            let d_b = new_bias - bias;
            for (k, fk) in f.iter_mut().enumerate() {
                *fk += d_i * gram[[i, k]] + d_j * gram[[j, k]] + d_b;
            }
            alpha[i] = new_i;
            alpha[j] = new_j;
            bias = new_bias;
            changed += 1;
        }

        if changed == 0 {
            clean_passes += 1;
        } else {
            clean_passes = 0;
        }
    }

    (alpha, bias)
}

fn train(x: &Array2<f64>, labels: &Array1<f64>, cost: f64, kernel: KernelFn, seed: u64) -> SvmModel {
    let y: Vec<f64> = labels.iter().map(|&v| if v == 1.0 { 1.0 } else { -1.0 }).collect();
    let gram = kernel.gram(x);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (alpha, bias) = smo(&gram, &y, cost, &mut rng);

    let support: Vec<usize> = (0..alpha.len()).filter(|&i| alpha[i] > 1e-8).collect();
    SvmModel {
        support: x.select(Axis(0), &support),
        coef: support.iter().map(|&i| alpha[i] * y[i]).collect(),
        bias,
        kernel,
    }
}

/// Support vector classifier with a linear or polynomial kernel
#[derive(Debug, Clone)]
pub struct SupportVectorClassifier {
    kernel: SvmKernel,
    name: String,
}

impl SupportVectorClassifier {
    pub fn new(kernel: SvmKernel) -> Self {
        let name = match kernel {
            SvmKernel::Linear => "SVC-Linear".to_string(),
            SvmKernel::Polynomial { .. } => "SVC-Polynomial".to_string(),
        };
        Self { kernel, name }
    }

    fn grid(&self, n_features: usize) -> Vec<(f64, KernelFn)> {
        let base = 1.0 / n_features.max(1) as f64;
        match self.kernel {
            SvmKernel::Linear => COST_GRID
                .iter()
                .map(|&c| (c, KernelFn { kernel: self.kernel, gamma: 1.0 }))
                .collect(),
            SvmKernel::Polynomial { .. } => COST_GRID
                .iter()
                .flat_map(|&c| {
                    GAMMA_SCALES.iter().map(move |&g| {
                        (c, KernelFn { kernel: self.kernel, gamma: g * base })
                    })
                })
                .collect(),
        }
    }
}

impl ModelAdapter for SupportVectorClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        match self.kernel {
            SvmKernel::Linear => "Soft-margin SVM, linear kernel, cost tuned by CV",
            SvmKernel::Polynomial { .. } => "Soft-margin SVM, polynomial kernel, cost and gamma tuned by CV",
        }
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }

    fn encoding(&self) -> CategoricalEncoding {
        CategoricalEncoding::OneHot
    }

    fn scaling(&self) -> Scaling {
        Scaling::Continuous
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
        let tuning = subsample(x.nrows(), TUNING_ROWS.min(options.max_train_rows), options.seed);
        let x_tune = x.select(Axis(0), &tuning);
        let y_tune = y.select(Axis(0), &tuning);

        let kfold = KFold::new(options.cv_folds, options.seed);
        let folds = kfold.split(x_tune.nrows());

        let mut best: Option<(f64, KernelFn, f64)> = None;
        for (cost, kernel) in self.grid(x.ncols()) {
            let mut hits = 0usize;
            for (fold_train, fold_validation) in &folds {
                let model = train(
                    &x_tune.select(Axis(0), fold_train),
                    &y_tune.select(Axis(0), fold_train),
                    cost,
                    kernel,
                    options.seed,
                );
                let predicted = model.predict(&x_tune.select(Axis(0), fold_validation));
                hits += fold_validation
                    .iter()
                    .zip(&predicted)
                    .filter(|(&row, &p)| p == y_tune[row])
                    .count();
            }
            let cv_accuracy = hits as f64 / x_tune.nrows().max(1) as f64;
            tracing::debug!(
                "{}: cost={} gamma={:.4} cv_accuracy={:.4}",
                self.name,
                cost,
                kernel.gamma,
                cv_accuracy
            );
            if best.as_ref().map_or(true, |b| cv_accuracy > b.2) {
                best = Some((cost, kernel, cv_accuracy));
            }
        }
        let (cost, kernel, cv_accuracy) =
            best.ok_or_else(|| EvalError::fit(self.name(), "empty hyperparameter grid"))?;

        let picked = subsample(x.nrows(), options.max_train_rows, options.seed);
        let x_fit = x.select(Axis(0), &picked);
        let model = train(&x_fit, &y.select(Axis(0), &picked), cost, kernel, options.seed);
        if model.coef.is_empty() {
            return Err(EvalError::fit(self.name(), "no support vectors found"));
        }

        let mut builder = ModelSummaryBuilder::new(x_fit.nrows())
            .with_features_used(design.names())
            .with_hyperparameter("cost", cost)
            .with_hyperparameter("cv_accuracy", cv_accuracy)
            .with_hyperparameter("tuning_rows", x_tune.nrows() as f64)
            .with_hyperparameter("support_vectors", model.coef.len() as f64);

        match self.kernel {
            SvmKernel::Linear => {
                // primal weights w = Σ coef_s s
                let weights = model
                    .support
                    .axis_iter(Axis(0))
                    .zip(&model.coef)
                    .fold(Array1::<f64>::zeros(x.ncols()), |acc, (s, &c)| acc + &(&s * c));
                let mut rows = vec![CoefficientRow {
                    term: INTERCEPT.to_string(),
                    estimate: model.bias,
                    std_error: None,
                    statistic: None,
                    p_value: None,
                }];
                rows.extend(design.names().into_iter().zip(weights.iter()).map(|(term, &w)| CoefficientRow {
                    term,
                    estimate: w,
                    std_error: None,
                    statistic: None,
                    p_value: None,
                }));
                builder = builder.with_coefficients(CoefficientTable {
                    rows,
                    statistic_name: "-".to_string(),
                    residual_df: None,
                });
            }
            SvmKernel::Polynomial { degree } => {
                builder = builder
                    .with_hyperparameter("gamma", kernel.gamma)
                    .with_hyperparameter("degree", f64::from(degree));
            }
        }

        Ok((Box::new(model), builder.build()))
    }
}
