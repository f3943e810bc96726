// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reproducible model-comparison pipeline
//!
//! Orchestrates:
//! - Configuration validation
//! - Track loading (CSV or seeded synthetic catalogue) and feature derivation
//! - One shared train/test split for every adapter
//! - Fitting, scoring and ranking of each adapter per task
//! - Report serialization (JSON and Markdown)

use crate::adapters::{
    classification_adapters, regression_adapters, AdapterSettings, FitOptions, ModelAdapter,
};
use crate::datasets::{synthetic_tracks, RawTable, SyntheticSpec, Track};
use crate::error::{EvalError, Result};
use crate::features::{DatasetProfile, FeatureDeriver, ModelDataset};
use crate::interpret::ModelSummary;
use crate::metrics::{
    select_threshold, threshold_sweep, validate_threshold, ClampRange, EvalOptions, EvaluationResult,
    Evaluator, OutputKind, TaskType, ThresholdPoint, DEFAULT_THRESHOLD,
};
use crate::split::{validate_fraction, DatasetSplitter, Split, DEFAULT_TRAIN_FRACTION};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

pub const REGRESSION_TARGET: &str = "popularity";
pub const CLASSIFICATION_TARGET: &str = "explicit";

/// Where the track table comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetSource {
    Synthetic,
    Csv { path: String },
}

/// How the classification threshold for probability outputs is chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    Fixed {
        threshold: f64,
    },
    /// Fit on part of the training rows, pick the threshold on the rest
    Validated {
        grid: Vec<f64>,
        validation_fraction: f64,
    },
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Fixed {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Configuration for the evaluation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub source: DatasetSource,
    /// Rows generated when `source` is synthetic
    pub synthetic_rows: usize,
    pub synthetic: SyntheticSpec,
    pub train_fraction: f64,
    pub clamp: ClampRange,
    pub threshold_policy: ThresholdPolicy,
    /// Thresholds reported in the sweep for probability outputs
    pub report_thresholds: Vec<f64>,
    pub cv_folds: usize,
    /// Row cap for expensive adapters
    pub max_train_rows: usize,
    pub adapters: AdapterSettings,
    /// Specific adapters to run (empty = all)
    pub adapter_names: Vec<String>,
    /// Output directory for results
    pub output_dir: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let fit = FitOptions::default();
        Self {
            seed: fit.seed,
            source: DatasetSource::Synthetic,
            synthetic_rows: 1000,
            synthetic: SyntheticSpec::default(),
            train_fraction: DEFAULT_TRAIN_FRACTION,
            clamp: ClampRange::default(),
            threshold_policy: ThresholdPolicy::default(),
            report_thresholds: vec![0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5],
            cv_folds: fit.cv_folds,
            max_train_rows: fit.max_train_rows,
            adapters: AdapterSettings::default(),
            adapter_names: vec![],
            output_dir: "eval/results".to_string(),
        }
    }
}

impl EvaluationConfig {
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Reject bad settings before any data is touched
    pub fn validate(&self) -> Result<()> {
        validate_fraction(self.train_fraction)?;
        self.clamp.validate()?;

        if self.source == DatasetSource::Synthetic {
            if self.synthetic_rows == 0 {
                return Err(EvalError::range("synthetic_rows", "must be at least 1"));
            }
            self.synthetic.validate()?;
        }
        if self.cv_folds < 2 {
            return Err(EvalError::range("cv_folds", format!("{} < 2", self.cv_folds)));
        }
        if self.max_train_rows == 0 {
            return Err(EvalError::range("max_train_rows", "must be at least 1"));
        }
        if self.adapters.knn_k == 0 {
            return Err(EvalError::range("knn_k", "must be at least 1"));
        }
        if self.adapters.forest_trees == 0 {
            return Err(EvalError::range("forest_trees", "must be at least 1"));
        }
        for &t in &self.report_thresholds {
            validate_threshold(t)?;
        }

        match &self.threshold_policy {
            ThresholdPolicy::Fixed { threshold } => validate_threshold(*threshold)?,
            ThresholdPolicy::Validated {
                grid,
                validation_fraction,
            } => {
                validate_fraction(*validation_fraction)?;
                if grid.is_empty() {
                    return Err(EvalError::range("threshold_grid", "grid is empty"));
                }
                for &t in grid {
                    validate_threshold(t)?;
                }
            }
        }
        Ok(())
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            seed: self.seed,
            cv_folds: self.cv_folds,
            max_train_rows: self.max_train_rows,
        }
    }

    pub fn eval_options(&self) -> EvalOptions {
        let threshold = match self.threshold_policy {
            ThresholdPolicy::Fixed { threshold } => threshold,
            ThresholdPolicy::Validated { .. } => DEFAULT_THRESHOLD,
        };
        EvalOptions {
            clamp: self.clamp,
            threshold,
        }
    }

    /// Keep only adapters named in `adapter_names` (all when empty)
    pub fn select_adapters(&self, adapters: Vec<Box<dyn ModelAdapter>>) -> Vec<Box<dyn ModelAdapter>> {
        if self.adapter_names.is_empty() {
            return adapters;
        }
        adapters
            .into_iter()
            .filter(|a| self.adapter_names.iter().any(|n| n.eq_ignore_ascii_case(a.name())))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Success,
    Failed,
}

/// Outcome of one adapter on the shared split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub algorithm: String,
    pub description: String,
    pub task: TaskType,
    pub target: String,
    pub status: EntryStatus,
    /// 1-based position among successes
    pub rank: Option<usize>,
    pub result: Option<EvaluationResult>,
    /// Threshold applied to probability outputs
    pub threshold: Option<f64>,
    pub threshold_sweep: Vec<ThresholdPoint>,
    pub summary: Option<ModelSummary>,
    pub error: Option<String>,
    pub fit_rows: usize,
    pub test_rows: usize,
}

impl ComparisonEntry {
    pub fn succeeded(&self) -> bool {
        self.status == EntryStatus::Success
    }

    pub fn primary_metric(&self) -> Option<f64> {
        self.result.as_ref().map(EvaluationResult::primary_metric)
    }

    fn failed(adapter: &dyn ModelAdapter, target: &str, test_rows: usize, error: &EvalError) -> Self {
        Self {
            algorithm: adapter.name().to_string(),
            description: adapter.description().to_string(),
            task: adapter.task(),
            target: target.to_string(),
            status: EntryStatus::Failed,
            rank: None,
            result: None,
            threshold: None,
            threshold_sweep: vec![],
            summary: None,
            error: Some(error.to_string()),
            fit_rows: 0,
            test_rows,
        }
    }
}

/// Runs adapters over one split and ranks them
#[derive(Debug, Clone)]
pub struct ComparisonRunner {
    fit_options: FitOptions,
    eval_options: EvalOptions,
    policy: ThresholdPolicy,
    report_thresholds: Vec<f64>,
}

impl ComparisonRunner {
    pub fn new(config: &EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fit_options: config.fit_options(),
            eval_options: config.eval_options(),
            policy: config.threshold_policy.clone(),
            report_thresholds: config.report_thresholds.clone(),
        })
    }

    /// One entry per adapter: successes ranked by their primary metric, then failures
    pub fn run(
        &self,
        dataset: &ModelDataset,
        split: &Split,
        adapters: &[Box<dyn ModelAdapter>],
        target: &str,
    ) -> Vec<ComparisonEntry> {
        let train = dataset.select_rows(split.train());
        let test = dataset.select_rows(split.test());

        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for adapter in adapters {
            tracing::info!("Evaluating {} on '{}'", adapter.name(), target);
            match self.run_one(adapter.as_ref(), dataset, split, &train, &test, target) {
                Ok(entry) => {
                    if let Some(result) = &entry.result {
                        tracing::info!(
                            "  {} - {}: {:.4}",
                            entry.algorithm,
                            primary_metric_name(result.task),
                            result.primary_metric()
                        );
                    }
                    successes.push(entry);
                }
                Err(e) => {
                    tracing::warn!("  {} failed: {}", adapter.name(), e);
                    failures.push(ComparisonEntry::failed(adapter.as_ref(), target, test.n_rows(), &e));
                }
            }
        }

        rank_entries(&mut successes);
        successes.extend(failures);
        successes
    }

    fn run_one(
        &self,
        adapter: &dyn ModelAdapter,
        dataset: &ModelDataset,
        split: &Split,
        train: &ModelDataset,
        test: &ModelDataset,
        target: &str,
    ) -> Result<ComparisonEntry> {
        let (fitted, threshold) = match (&self.policy, adapter.output()) {
            (
                ThresholdPolicy::Validated {
                    grid,
                    validation_fraction,
                },
                OutputKind::Probability,
            ) => {
                let (fit_rows, validation_rows) =
                    DatasetSplitter::split_indices(split.train(), 1.0 - validation_fraction, self.fit_options.seed)?;
                let fit_set = dataset.select_rows(&fit_rows);
                let validation = dataset.select_rows(&validation_rows);

                let fitted = adapter.fit(&fit_set, target, &self.fit_options)?;
                let probabilities = adapter.predict(&fitted, &validation)?;
                let truth = target_values(&validation, adapter, target)?;
                let threshold = select_threshold(&truth, &probabilities.values, grid)?;
                tracing::info!(
                    "  {} threshold {} selected on {} validation rows",
                    adapter.name(),
                    threshold,
                    validation.n_rows()
                );
                (fitted, threshold)
            }
            _ => (adapter.fit(train, target, &self.fit_options)?, self.eval_options.threshold),
        };

        let predictions = adapter.predict(&fitted, test)?;
        let truth = target_values(test, adapter, target)?;
        let evaluator = Evaluator::new(self.eval_options.with_threshold(threshold))?;
        let result = evaluator.evaluate(adapter.name(), adapter.task(), &truth, &predictions)?;

        let (threshold, sweep) = if predictions.kind == OutputKind::Probability {
            (
                Some(threshold),
                threshold_sweep(&truth, &predictions.values, &self.report_thresholds)?,
            )
        } else {
            (None, vec![])
        };

        Ok(ComparisonEntry {
            algorithm: adapter.name().to_string(),
            description: adapter.description().to_string(),
            task: adapter.task(),
            target: target.to_string(),
            status: EntryStatus::Success,
            rank: None,
            result: Some(result),
            threshold,
            threshold_sweep: sweep,
            summary: Some(fitted.summary().clone()),
            error: None,
            fit_rows: fitted.summary().training_rows,
            test_rows: test.n_rows(),
        })
    }
}

fn target_values(rows: &ModelDataset, adapter: &dyn ModelAdapter, target: &str) -> Result<Vec<f64>> {
    rows.column(target)
        .map(|c| c.to_vec())
        .ok_or_else(|| EvalError::fit(adapter.name(), format!("target column '{}' is not in the dataset", target)))
}

pub fn primary_metric_name(task: TaskType) -> &'static str {
    match task {
        TaskType::Regression => "MSE",
        TaskType::Classification => "Accuracy",
    }
}

/// Stable sort: ascending MSE or descending accuracy, then assign ranks
fn rank_entries(entries: &mut [ComparisonEntry]) {
    entries.sort_by(|a, b| {
        let (Some(ra), Some(rb)) = (&a.result, &b.result) else {
            return Ordering::Equal;
        };
        let ord = ra
            .primary_metric()
            .partial_cmp(&rb.primary_metric())
            .unwrap_or(Ordering::Equal);
        if ra.higher_is_better() {
            ord.reverse()
        } else {
            ord
        }
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = Some(i + 1);
    }
}

/// Entries for one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResults {
    pub task: TaskType,
    pub target: String,
    pub entries: Vec<ComparisonEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub source: String,
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub split_seed: u64,
    pub profile: DatasetProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestModel {
    pub task: TaskType,
    pub target: String,
    pub algorithm: String,
    pub metric: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub best: Vec<BestModel>,
    pub succeeded: usize,
    pub failed: usize,
}

impl ComparisonSummary {
    pub fn from_tasks(tasks: &[TaskResults]) -> Self {
        let best = tasks
            .iter()
            .filter_map(|t| {
                let top = t.entries.iter().find(|e| e.rank == Some(1))?;
                let result = top.result.as_ref()?;
                Some(BestModel {
                    task: t.task,
                    target: t.target.clone(),
                    algorithm: top.algorithm.clone(),
                    metric: primary_metric_name(t.task).to_string(),
                    value: result.primary_metric(),
                })
            })
            .collect();

        let all = tasks.iter().flat_map(|t| t.entries.iter());
        let succeeded = all.clone().filter(|e| e.succeeded()).count();
        let failed = all.filter(|e| !e.succeeded()).count();

        Self {
            best,
            succeeded,
            failed,
        }
    }
}

/// Complete comparison results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub config: EvaluationConfig,
    pub dataset_info: DatasetInfo,
    pub tasks: Vec<TaskResults>,
    pub summary: ComparisonSummary,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl ComparisonReport {
    /// Save results to JSON file
    pub fn save_json(&self, output_path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))
            .with_context(|| format!("creating directory for {}", output_path.display()))?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(output_path, json).with_context(|| format!("writing {}", output_path.display()))?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    pub fn save_markdown(&self, output_path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))
            .with_context(|| format!("creating directory for {}", output_path.display()))?;
        std::fs::write(output_path, self.to_markdown())
            .with_context(|| format!("writing {}", output_path.display()))?;
        tracing::info!("Report saved to {}", output_path.display());
        Ok(())
    }

    /// Generate a markdown report
    pub fn to_markdown(&self) -> String {
        let mut report = String::new();

        report.push_str("# Track Model Comparison Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", self.version));

        let info = &self.dataset_info;
        report.push_str("## Dataset\n\n");
        report.push_str(&format!("- **Source:** {}\n", info.source));
        report.push_str(&format!("- **Total Rows:** {}\n", info.total_rows));
        report.push_str(&format!(
            "- **Split Sizes:** Train={}, Test={} (seed {})\n",
            info.train_rows, info.test_rows, info.split_seed
        ));
        report.push_str(&format!("- **Explicit Rate:** {:.4}\n", info.profile.explicit_rate));
        report.push_str(&format!("- **Mean Popularity:** {:.2}\n", info.profile.mean_popularity));
        report.push_str(&format!("- **Mean Artists per Track:** {:.2}\n\n", info.profile.mean_num_artists));

        report.push_str("| Decade | Tracks |\n|--------|--------|\n");
        for (decade, count) in &info.profile.decade_distribution {
            report.push_str(&format!("| {} | {} |\n", decade, count));
        }
        report.push_str("\n| Release Date Precision | Tracks |\n|------------------------|--------|\n");
        for (precision, count) in &info.profile.release_date_precision {
            report.push_str(&format!("| {} | {} |\n", precision, count));
        }
        report.push('\n');

        report.push_str("## Summary\n\n");
        for best in &self.summary.best {
            report.push_str(&format!(
                "**Best {} model ({}):** {} ({}={:.4})\n\n",
                best.task, best.target, best.algorithm, best.metric, best.value
            ));
        }
        report.push_str(&format!(
            "Adapters succeeded: {}, failed: {}\n\n",
            self.summary.succeeded, self.summary.failed
        ));

        for task in &self.tasks {
            report.push_str(&format!("### {} ({})\n\n", capitalize(&task.task.to_string()), task.target));
            match task.task {
                TaskType::Regression => {
                    report.push_str("| Rank | Model | Status | MSE | RMSE | MAE | Clamped |\n");
                    report.push_str("|------|-------|--------|-----|------|-----|---------|\n");
                    for entry in &task.entries {
                        let cells = entry
                            .result
                            .as_ref()
                            .and_then(EvaluationResult::regression)
                            .map_or("- | - | - | -".to_string(), |m| {
                                format!("{:.4} | {:.4} | {:.4} | {}", m.mse, m.rmse, m.mae, m.clamped)
                            });
                        report.push_str(&format!(
                            "| {} | {} | {:?} | {} |\n",
                            rank_cell(entry),
                            entry.algorithm,
                            entry.status,
                            cells
                        ));
                    }
                }
                TaskType::Classification => {
                    report.push_str("| Rank | Model | Status | Accuracy | Type I | Type II | F1 | AUC-ROC |\n");
                    report.push_str("|------|-------|--------|----------|--------|---------|----|---------|\n");
                    for entry in &task.entries {
                        let cells = entry
                            .result
                            .as_ref()
                            .and_then(EvaluationResult::classification)
                            .map_or("- | - | - | - | -".to_string(), |m| {
                                format!(
                                    "{:.4} | {:.4} | {:.4} | {:.4} | {}",
                                    m.accuracy,
                                    m.type_i_error,
                                    m.type_ii_error,
                                    m.f1_score,
                                    m.auc_roc.map_or("-".to_string(), |v| format!("{:.4}", v))
                                )
                            });
                        report.push_str(&format!(
                            "| {} | {} | {:?} | {} |\n",
                            rank_cell(entry),
                            entry.algorithm,
                            entry.status,
                            cells
                        ));
                    }
                }
            }
            report.push('\n');
        }

        report.push_str("## Detailed Results\n\n");
        for entry in self.tasks.iter().flat_map(|t| t.entries.iter()) {
            report.push_str(&format!("### {} ({})\n\n", entry.algorithm, entry.target));
            report.push_str(&format!("*{}*\n\n", entry.description));

            if let Some(ref error) = entry.error {
                report.push_str(&format!("**Failed:** {}\n\n", error));
                continue;
            }
            report.push_str(&format!("- Training rows used: {}\n", entry.fit_rows));
            report.push_str(&format!("- Test rows: {}\n", entry.test_rows));
            if let Some(t) = entry.threshold {
                report.push_str(&format!("- Threshold: {}\n", t));
            }
            report.push('\n');

            if let Some(ref result) = entry.result {
                report.push_str("#### Performance Metrics\n\n");
                report.push_str(&format!("```\n{}\n```\n\n", result.format()));
            }

            if !entry.threshold_sweep.is_empty() {
                report.push_str("#### Threshold Sweep\n\n");
                report.push_str("| Threshold | Accuracy | Type I | Type II |\n");
                report.push_str("|-----------|----------|--------|---------|\n");
                for point in &entry.threshold_sweep {
                    report.push_str(&format!(
                        "| {:.2} | {:.4} | {:.4} | {:.4} |\n",
                        point.threshold, point.accuracy, point.type_i_error, point.type_ii_error
                    ));
                }
                report.push('\n');
            }

            if let Some(ref summary) = entry.summary {
                report.push_str("#### Model Summary\n\n");
                report.push_str(&format!("```\n{}```\n\n", summary.format()));
            }
        }

        report.push_str("## Configuration\n\n");
        report.push_str(&format!(
            "```json\n{}\n```\n",
            serde_json::to_string_pretty(&self.config).unwrap_or_default()
        ));

        report
    }
}

fn rank_cell(entry: &ComparisonEntry) -> String {
    entry.rank.map_or("-".to_string(), |r| r.to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Main evaluation pipeline
pub struct EvaluationPipeline {
    config: EvaluationConfig,
}

impl EvaluationPipeline {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Tracks from the configured source
    pub fn load_tracks(&self) -> Result<Vec<Track>> {
        match &self.config.source {
            DatasetSource::Synthetic => {
                tracing::info!(
                    "Generating {} synthetic tracks with seed {}",
                    self.config.synthetic_rows,
                    self.config.seed
                );
                synthetic_tracks(self.config.synthetic_rows, self.config.seed, &self.config.synthetic)
            }
            DatasetSource::Csv { path } => {
                let raw = RawTable::from_csv_path(Path::new(path))?;
                FeatureDeriver::parse_tracks(&raw)
            }
        }
    }

    /// Run the full evaluation pipeline
    pub fn run(&self) -> Result<ComparisonReport> {
        self.config.validate()?;
        let runner = ComparisonRunner::new(&self.config)?;

        let tracks = self.load_tracks()?;
        let dataset = FeatureDeriver::derive_tracks(&tracks)?;
        let profile = FeatureDeriver::profile(&tracks)?;
        let split = DatasetSplitter::split(dataset.n_rows(), self.config.train_fraction, self.config.seed)?;

        tracing::info!(
            "Dataset ready: {} rows (train={}, test={})",
            dataset.n_rows(),
            split.train().len(),
            split.test().len()
        );

        let dataset_info = DatasetInfo {
            source: match &self.config.source {
                DatasetSource::Synthetic => "synthetic".to_string(),
                DatasetSource::Csv { path } => path.clone(),
            },
            total_rows: dataset.n_rows(),
            train_rows: split.train().len(),
            test_rows: split.test().len(),
            split_seed: split.seed(),
            profile,
        };

        let plan = [
            (
                TaskType::Regression,
                REGRESSION_TARGET,
                self.config.select_adapters(regression_adapters(&self.config.adapters)),
            ),
            (
                TaskType::Classification,
                CLASSIFICATION_TARGET,
                self.config.select_adapters(classification_adapters(&self.config.adapters)),
            ),
        ];

        let mut tasks = Vec::new();
        for (task, target, adapters) in plan {
            if adapters.is_empty() {
                tracing::warn!("No {} adapters selected; skipping '{}'", task, target);
                continue;
            }
            let entries = runner.run(&dataset, &split, &adapters, target);
            tasks.push(TaskResults {
                task,
                target: target.to_string(),
                entries,
            });
        }

        let summary = ComparisonSummary::from_tasks(&tasks);
        Ok(ComparisonReport {
            config: self.config.clone(),
            dataset_info,
            tasks,
            summary,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
