// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model comparison pipeline for music track popularity and explicit content
//!
//! This crate provides:
//! - Track loading from CSV and a seeded synthetic catalogue
//! - Feature derivation (artist counts, decade buckets, categorical tagging)
//! - Seeded train/test splits, subsamples and K-fold partitions
//! - Regression and classification adapters behind one `ModelAdapter` trait
//! - Evaluation metrics (clamped MSE, contingency tables, Type I/II error rates)
//! - A comparison runner that ranks adapters and survives individual failures

pub mod adapters;
pub mod datasets;
pub mod error;
pub mod features;
pub mod interpret;
pub mod metrics;
pub mod pipeline;
pub mod split;

pub use adapters::{all_adapters, find_adapter, AdapterSettings, FitOptions, FittedModel, ModelAdapter};
pub use datasets::{synthetic_tracks, RawTable, SyntheticSpec, Track};
pub use error::{EvalError, Result};
pub use features::{Decade, FeatureDeriver, ModelDataset};
pub use interpret::{CoefficientTable, FeatureImportance, ModelSummary};
pub use metrics::{ConfusionMatrix, EvalOptions, EvaluationResult, Evaluator, Predictions, TaskType};
pub use pipeline::{
    ComparisonEntry, ComparisonReport, ComparisonRunner, EvaluationConfig, EvaluationPipeline, ThresholdPolicy,
};
pub use split::{DatasetSplitter, KFold, Split};
