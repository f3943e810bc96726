// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model adapters for popularity regression and explicit-content classification
//!
//! Implements:
//! - Linear regression (OLS) and lasso with a cross-validated penalty
//! - CART decision tree and random forest
//! - Logistic regression (IRLS)
//! - Linear and quadratic discriminant analysis
//! - k-nearest neighbours
//! - Soft-margin support vector classifiers (linear and polynomial kernels)
//!
//! Every family sits behind the same `ModelAdapter` trait so the comparison
//! runner can treat them uniformly.

pub mod design;
pub mod discriminant;
pub mod knn;
pub mod linalg;
pub mod linear;
pub mod logistic;
pub mod svm;
pub mod tree;

pub use design::{CategoricalEncoding, DesignSpec, Scaling};
pub use discriminant::{LinearDiscriminant, QuadraticDiscriminant};
pub use knn::KNearestNeighbors;
pub use linear::{LassoRegression, LinearRegression};
pub use logistic::LogisticRegression;
pub use svm::{SvmKernel, SupportVectorClassifier};
pub use tree::{DecisionTree, RandomForest};

use crate::error::{EvalError, Result};
use crate::features::{ColumnKind, ModelDataset};
use crate::interpret::ModelSummary;
use crate::metrics::{OutputKind, Predictions, TaskType};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run-wide knobs every adapter receives at fit time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub seed: u64,
    /// Folds for hyperparameter cross-validation
    pub cv_folds: usize,
    /// Row cap for expensive adapters (forest, SVMs, neighbours)
    pub max_train_rows: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            cv_folds: 5,
            max_train_rows: 1500,
        }
    }
}

/// Family-specific hyperparameters that are fixed rather than tuned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdapterSettings {
    pub knn_k: usize,
    /// Standardize continuous predictors before computing distances
    pub knn_standardize: bool,
    pub forest_trees: usize,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            knn_k: 5,
            knn_standardize: true,
            forest_trees: 100,
        }
    }
}

/// Scores rows of an already-transformed design matrix
pub trait Predictor: fmt::Debug + Send + Sync {
    fn predict(&self, x: &Array2<f64>) -> Vec<f64>;
}

/// Parameters learned by one adapter on one training set.
///
/// Carries the design recipe so prediction applies exactly the encoding and
/// scaling seen in training.
#[derive(Debug)]
pub struct FittedModel {
    adapter: String,
    target: String,
    design: DesignSpec,
    output: OutputKind,
    predictor: Box<dyn Predictor>,
    summary: ModelSummary,
}

impl FittedModel {
    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn design(&self) -> &DesignSpec {
        &self.design
    }

    pub fn output(&self) -> OutputKind {
        self.output
    }

    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }
}

/// Trait for all model families
pub trait ModelAdapter: Send + Sync {
    /// Get adapter name
    fn name(&self) -> &str;

    /// Get adapter description
    fn description(&self) -> &str;

    fn task(&self) -> TaskType;

    fn encoding(&self) -> CategoricalEncoding;

    fn scaling(&self) -> Scaling {
        Scaling::None
    }

    fn output(&self) -> OutputKind;

    /// Train on a prepared design matrix. `y` holds 0/1 for classification.
    fn fit_design(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        design: &DesignSpec,
        options: &FitOptions,
    ) -> Result<(Box<dyn Predictor>, ModelSummary)>;

    /// Validate the target, learn the design recipe and fit
    fn fit(&self, train: &ModelDataset, target: &str, options: &FitOptions) -> Result<FittedModel> {
        let spec = train.column_spec(target).ok_or_else(|| {
            EvalError::fit(self.name(), format!("target column '{}' is not in the dataset", target))
        })?;

        let task_matches = match (self.task(), &spec.kind) {
            (TaskType::Regression, ColumnKind::Continuous) => true,
            (TaskType::Classification, ColumnKind::Categorical { levels }) => levels.len() == 2,
            _ => false,
        };
        if !task_matches {
            return Err(EvalError::fit(
                self.name(),
                format!("'{}' is not a {} target", target, self.task()),
            ));
        }

        let design = DesignSpec::learn(train, target, self.encoding(), self.scaling());
        if design.width() == 0 {
            return Err(EvalError::fit(self.name(), "no usable predictors after encoding"));
        }
        let required = 2 * design.width();
        if train.n_rows() < required {
            return Err(EvalError::fit(
                self.name(),
                format!(
                    "{} training rows for {} design columns (need at least {})",
                    train.n_rows(),
                    design.width(),
                    required
                ),
            ));
        }

        let y = train
            .column(target)
            .map(|c| c.to_owned())
            .ok_or_else(|| EvalError::fit(self.name(), format!("target column '{}' is not in the dataset", target)))?;

        if self.task() == TaskType::Classification {
            let positives = y.iter().filter(|&&v| v == 1.0).count();
            if positives == 0 || positives == y.len() {
                return Err(EvalError::fit(
                    self.name(),
                    format!("training target '{}' holds a single class", target),
                ));
            }
        }

        let x = design.transform(train)?;
        tracing::debug!(
            "{}: fitting on {} rows x {} design columns",
            self.name(),
            x.nrows(),
            x.ncols()
        );

        let (predictor, mut summary) = self.fit_design(&x, &y, &design, options)?;
        for dropped in design.dropped() {
            summary.notes.push(format!("dropped '{}': {}", dropped.column, dropped.reason));
        }

        Ok(FittedModel {
            adapter: self.name().to_string(),
            target: target.to_string(),
            design,
            output: self.output(),
            predictor,
            summary,
        })
    }

    /// Score rows with a model this adapter produced
    fn predict(&self, fitted: &FittedModel, rows: &ModelDataset) -> Result<Predictions> {
        if fitted.adapter != self.name() {
            return Err(EvalError::fit(
                self.name(),
                format!("fitted model was produced by {}", fitted.adapter),
            ));
        }
        let x = fitted.design.transform(rows)?;
        Ok(Predictions {
            kind: fitted.output,
            values: fitted.predictor.predict(&x),
        })
    }
}

/// Regression adapters, in report order
pub fn regression_adapters(settings: &AdapterSettings) -> Vec<Box<dyn ModelAdapter>> {
    vec![
        Box::new(LinearRegression::new()),
        Box::new(LassoRegression::new()),
        Box::new(DecisionTree::new()),
        Box::new(RandomForest::new(settings.forest_trees)),
    ]
}

/// Classification adapters, in report order
pub fn classification_adapters(settings: &AdapterSettings) -> Vec<Box<dyn ModelAdapter>> {
    vec![
        Box::new(LogisticRegression::new()),
        Box::new(LinearDiscriminant::new()),
        Box::new(QuadraticDiscriminant::new()),
        Box::new(KNearestNeighbors::new(settings.knn_k, settings.knn_standardize)),
        Box::new(SupportVectorClassifier::new(SvmKernel::Linear)),
        Box::new(SupportVectorClassifier::new(SvmKernel::Polynomial { degree: 3 })),
    ]
}

pub fn all_adapters(settings: &AdapterSettings) -> Vec<Box<dyn ModelAdapter>> {
    let mut adapters = regression_adapters(settings);
    adapters.extend(classification_adapters(settings));
    adapters
}

/// Look an adapter up by name, ignoring case
pub fn find_adapter(name: &str, settings: &AdapterSettings) -> Option<Box<dyn ModelAdapter>> {
    all_adapters(settings)
        .into_iter()
        .find(|a| a.name().eq_ignore_ascii_case(name))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::datasets::{synthetic_tracks, SyntheticSpec};
    use crate::features::{FeatureDeriver, ModelDataset};

    pub fn synthetic_dataset(rows: usize, seed: u64) -> ModelDataset {
        let tracks = synthetic_tracks(rows, seed, &SyntheticSpec::default()).expect("synthetic");
        FeatureDeriver::derive_tracks(&tracks).expect("derive")
    }

    pub fn accuracy(truth: &[f64], predicted: &[f64], threshold: f64) -> f64 {
        let hits = truth
            .iter()
            .zip(predicted)
            .filter(|(&t, &p)| (p > threshold) == (t == 1.0))
            .count();
        hits as f64 / truth.len() as f64
    }

    pub fn majority_rate(truth: &[f64]) -> f64 {
        let positives = truth.iter().filter(|&&t| t == 1.0).count() as f64 / truth.len() as f64;
        positives.max(1.0 - positives)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::synthetic_dataset;
    use super::*;

    #[test]
    fn test_registry_tasks() {
        let settings = AdapterSettings::default();
        assert!(regression_adapters(&settings)
            .iter()
            .all(|a| a.task() == TaskType::Regression));
        assert!(classification_adapters(&settings)
            .iter()
            .all(|a| a.task() == TaskType::Classification));

        let names: Vec<String> = all_adapters(&settings).iter().map(|a| a.name().to_string()).collect();
        let unique: std::collections::BTreeSet<&String> = names.iter().collect();
        assert_eq!(names.len(), 10);
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_find_adapter_case_insensitive() {
        let settings = AdapterSettings::default();
        let adapter = find_adapter("linearregression", &settings).expect("found");
        assert_eq!(adapter.name(), "LinearRegression");
        assert!(find_adapter("NeuralNet", &settings).is_none());
    }

    #[test]
    fn test_missing_target_is_fit_error() {
        let data = synthetic_dataset(60, 1);
        let err = LinearRegression::new()
            .fit(&data, "chart_position", &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, EvalError::Fit { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_wrong_task_target_is_fit_error() {
        let data = synthetic_dataset(60, 1);
        let options = FitOptions::default();

        assert!(matches!(
            LinearRegression::new().fit(&data, "explicit", &options),
            Err(EvalError::Fit { .. })
        ));
        assert!(matches!(
            LogisticRegression::new().fit(&data, "popularity", &options),
            Err(EvalError::Fit { .. })
        ));
    }

    #[test]
    fn test_too_few_rows_is_fit_error() {
        let data = synthetic_dataset(12, 3);
        match LinearRegression::new().fit(&data, "popularity", &FitOptions::default()) {
            Err(EvalError::Fit { reason, .. }) => assert!(reason.contains("training rows")),
            other => panic!("expected fit error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_foreign_fitted_model_rejected() {
        let data = synthetic_dataset(120, 4);
        let options = FitOptions::default();
        let fitted = LinearRegression::new().fit(&data, "popularity", &options).unwrap();

        assert_eq!(fitted.adapter(), "LinearRegression");
        assert_eq!(fitted.target(), "popularity");
        assert!(LassoRegression::new().predict(&fitted, &data).is_err());
        assert_eq!(LinearRegression::new().predict(&fitted, &data).unwrap().len(), 120);
    }
}
