// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for the regression and classification tasks
//!
//! - Regression: predictions clamped into the target range, then MSE/RMSE/MAE
//! - Classification: thresholded probabilities or hard labels, 2x2 contingency
//!   table, accuracy, Type I / Type II error rates, precision, recall, F1, MCC
//! - Threshold sweeps over one set of probabilities (no refitting)

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Regression,
    Classification,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Regression => write!(f, "regression"),
            TaskType::Classification => write!(f, "classification"),
        }
    }
}

/// What the numbers in a `Predictions` mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    /// Unbounded continuous estimate (regression)
    Continuous,
    /// P(positive class)
    Probability,
    /// Hard class label, 0.0 or 1.0
    Label,
}

/// Raw adapter output, before clamping or thresholding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub kind: OutputKind,
    pub values: Vec<f64>,
}

impl Predictions {
    pub fn continuous(values: Vec<f64>) -> Self {
        Self { kind: OutputKind::Continuous, values }
    }

    pub fn probabilities(values: Vec<f64>) -> Self {
        Self { kind: OutputKind::Probability, values }
    }

    pub fn labels(values: Vec<f64>) -> Self {
        Self { kind: OutputKind::Label, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Valid domain of the regression target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ClampRange {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

impl ClampRange {
    pub fn validate(&self) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(EvalError::range(
                "clamp",
                format!("need finite min < max, got [{}, {}]", self.min, self.max),
            ))
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalOptions {
    pub clamp: ClampRange,
    /// Probabilities strictly above this are predicted positive
    pub threshold: f64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            clamp: ClampRange::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EvalOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.clamp.validate()?;
        validate_threshold(self.threshold)
    }
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(EvalError::range(
            "threshold",
            format!("{} is outside [0, 1]", threshold),
        ))
    }
}

/// Contingency table for the binary target (positive = explicit)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Positive truth predicted positive
    pub tp: usize,
    /// Negative truth predicted negative
    pub tn: usize,
    /// Negative truth predicted positive (Type I)
    pub fp: usize,
    /// Positive truth predicted negative (Type II)
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Both slices hold 0/1 class labels
    pub fn from_labels(predicted: &[bool], truth: &[bool]) -> Self {
        let mut matrix = Self::default();

        for (pred, actual) in predicted.iter().zip(truth.iter()) {
            match (pred, actual) {
                (true, true) => matrix.tp += 1,
                (false, false) => matrix.tn += 1,
                (true, false) => matrix.fp += 1,
                (false, true) => matrix.fn_ += 1,
            }
        }

        matrix
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Accuracy: (TP + TN) / Total
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Type I error rate (false-positive rate): FP / (FP + TN)
    pub fn type_i_error(&self) -> f64 {
        ratio(self.fp, self.fp + self.tn)
    }

    /// Type II error rate (false-negative rate): FN / (FN + TP)
    pub fn type_ii_error(&self) -> f64 {
        ratio(self.fn_, self.fn_ + self.tp)
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Recall (Sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let denom = precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / denom
    }

    /// Matthews Correlation Coefficient, -1..1
    pub fn mcc(&self) -> f64 {
        let tp = self.tp as f64;
        let tn = self.tn as f64;
        let fp = self.fp as f64;
        let fn_ = self.fn_ as f64;

        let numerator = tp * tn - fp * fn_;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();

        if denominator == 0.0 {
            return 0.0;
        }
        numerator / denominator
    }

    pub fn format(&self) -> String {
        format!(
            r#"                  Predicted
                  Clean     Explicit
Actual Clean     {:>6}    {:>6}
       Explicit  {:>6}    {:>6}
"#,
            self.tn, self.fp, self.fn_, self.tp,
        )
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        return 0.0;
    }
    num as f64 / denom as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean squared error of clamped predictions
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Predictions moved by clamping
    pub clamped: usize,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub confusion_matrix: ConfusionMatrix,
    /// Threshold applied, `None` when the adapter emitted hard labels
    pub threshold: Option<f64>,
    pub accuracy: f64,
    pub type_i_error: f64,
    pub type_ii_error: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub mcc: f64,
    /// AUC-ROC, only for probability outputs
    pub auc_roc: Option<f64>,
    pub support: usize,
}

impl ClassificationMetrics {
    pub fn from_confusion_matrix(cm: ConfusionMatrix, threshold: Option<f64>) -> Self {
        Self {
            threshold,
            accuracy: cm.accuracy(),
            type_i_error: cm.type_i_error(),
            type_ii_error: cm.type_ii_error(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1_score: cm.f1_score(),
            mcc: cm.mcc(),
            auc_roc: None,
            support: cm.total(),
            confusion_matrix: cm,
        }
    }

    pub fn format(&self) -> String {
        let threshold = self
            .threshold
            .map_or("hard labels".to_string(), |t| format!("{:.2}", t));
        let mut out = format!(
            r#"Classification Report
=====================
Threshold:         {}
Accuracy:          {:.4} ({:.2}%)
Type I error:      {:.4}
Type II error:     {:.4}
Precision:         {:.4}
Recall:            {:.4}
F1 Score:          {:.4}
MCC:               {:.4}
Support:           {}
"#,
            threshold,
            self.accuracy,
            self.accuracy * 100.0,
            self.type_i_error,
            self.type_ii_error,
            self.precision,
            self.recall,
            self.f1_score,
            self.mcc,
            self.support,
        );
        if let Some(auc) = self.auc_roc {
            out.push_str(&format!("AUC-ROC:           {:.4}\n", auc));
        }
        out.push_str("\nContingency Table:\n");
        out.push_str(&self.confusion_matrix.format());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Metrics {
    Regression(RegressionMetrics),
    Classification(ClassificationMetrics),
}

/// Scored outcome of one adapter on one evaluation set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub algorithm: String,
    pub task: TaskType,
    pub metrics: Metrics,
}

impl EvaluationResult {
    /// MSE for regression, accuracy for classification
    pub fn primary_metric(&self) -> f64 {
        match &self.metrics {
            Metrics::Regression(m) => m.mse,
            Metrics::Classification(m) => m.accuracy,
        }
    }

    pub fn higher_is_better(&self) -> bool {
        self.task == TaskType::Classification
    }

    pub fn regression(&self) -> Option<&RegressionMetrics> {
        match &self.metrics {
            Metrics::Regression(m) => Some(m),
            Metrics::Classification(_) => None,
        }
    }

    pub fn classification(&self) -> Option<&ClassificationMetrics> {
        match &self.metrics {
            Metrics::Classification(m) => Some(m),
            Metrics::Regression(_) => None,
        }
    }

    pub fn format(&self) -> String {
        match &self.metrics {
            Metrics::Regression(m) => format!(
                r#"Regression Report
=================
MSE:               {:.4}
RMSE:              {:.4}
MAE:               {:.4}
Clamped:           {}
Support:           {}
"#,
                m.mse, m.rmse, m.mae, m.clamped, m.support
            ),
            Metrics::Classification(m) => m.format(),
        }
    }
}

/// One row of a threshold sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPoint {
    pub threshold: f64,
    pub accuracy: f64,
    pub type_i_error: f64,
    pub type_ii_error: f64,
    pub confusion_matrix: ConfusionMatrix,
}

/// Scores predictions for either task under a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    options: EvalOptions,
}

impl Evaluator {
    pub fn new(options: EvalOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn evaluate(
        &self,
        algorithm: &str,
        task: TaskType,
        truth: &[f64],
        predictions: &Predictions,
    ) -> Result<EvaluationResult> {
        check_lengths(truth.len(), predictions.len())?;

        let metrics = match (task, predictions.kind) {
            (TaskType::Regression, OutputKind::Continuous) => {
                Metrics::Regression(regression_metrics(truth, &predictions.values, &self.options.clamp)?)
            }
            (TaskType::Classification, OutputKind::Probability) => {
                let truth = binary_truth(truth)?;
                let predicted = threshold_probabilities(&predictions.values, self.options.threshold);
                let cm = ConfusionMatrix::from_labels(&predicted, &truth);
                let mut m = ClassificationMetrics::from_confusion_matrix(cm, Some(self.options.threshold));
                m.auc_roc = Some(auc_roc(&truth, &predictions.values));
                Metrics::Classification(m)
            }
            (TaskType::Classification, OutputKind::Label) => {
                let truth = binary_truth(truth)?;
                let predicted = binary_labels("predicted label", &predictions.values)?;
                let cm = ConfusionMatrix::from_labels(&predicted, &truth);
                Metrics::Classification(ClassificationMetrics::from_confusion_matrix(cm, None))
            }
            (task, kind) => {
                return Err(EvalError::range(
                    "predictions",
                    format!("{:?} output cannot be scored as {}", kind, task),
                ))
            }
        };

        Ok(EvaluationResult {
            algorithm: algorithm.to_string(),
            task,
            metrics,
        })
    }
}

/// Clamp, then score. A clamped value outside the range is an internal bug.
pub fn regression_metrics(truth: &[f64], raw: &[f64], clamp: &ClampRange) -> Result<RegressionMetrics> {
    check_lengths(truth.len(), raw.len())?;

    let mut sq = 0.0;
    let mut abs = 0.0;
    let mut clamped = 0usize;

    for (&actual, &value) in truth.iter().zip(raw.iter()) {
        let scored = clamp.apply(value);
        if !(clamp.min..=clamp.max).contains(&scored) {
            return Err(EvalError::PredictionRange {
                value: scored,
                min: clamp.min,
                max: clamp.max,
            });
        }
        if scored != value {
            clamped += 1;
        }
        let err = scored - actual;
        sq += err * err;
        abs += err.abs();
    }

    let n = truth.len();
    let mse = if n == 0 { 0.0 } else { sq / n as f64 };
    Ok(RegressionMetrics {
        mse,
        rmse: mse.sqrt(),
        mae: if n == 0 { 0.0 } else { abs / n as f64 },
        clamped,
        support: n,
    })
}

pub fn threshold_probabilities(probabilities: &[f64], threshold: f64) -> Vec<bool> {
    probabilities.iter().map(|&p| p > threshold).collect()
}

/// Re-score one set of probabilities at several thresholds
pub fn threshold_sweep(truth: &[f64], probabilities: &[f64], thresholds: &[f64]) -> Result<Vec<ThresholdPoint>> {
    check_lengths(truth.len(), probabilities.len())?;
    let truth = binary_truth(truth)?;

    thresholds
        .iter()
        .map(|&threshold| {
            validate_threshold(threshold)?;
            let predicted = threshold_probabilities(probabilities, threshold);
            let cm = ConfusionMatrix::from_labels(&predicted, &truth);
            Ok(ThresholdPoint {
                threshold,
                accuracy: cm.accuracy(),
                type_i_error: cm.type_i_error(),
                type_ii_error: cm.type_ii_error(),
                confusion_matrix: cm,
            })
        })
        .collect()
}

/// Accuracy-maximizing threshold from `grid`; ties keep the earlier grid entry.
///
/// Call this on a validation split only.
pub fn select_threshold(truth: &[f64], probabilities: &[f64], grid: &[f64]) -> Result<f64> {
    let sweep = threshold_sweep(truth, probabilities, grid)?;
    sweep
        .iter()
        .fold(None::<&ThresholdPoint>, |best, point| match best {
            Some(b) if b.accuracy >= point.accuracy => Some(b),
            _ => Some(point),
        })
        .map(|p| p.threshold)
        .ok_or_else(|| EvalError::range("threshold_grid", "grid is empty"))
}

/// AUC-ROC by the trapezoidal rule over descending scores.
///
/// Rows sharing a score move the curve in one step, so ties count half.
pub fn auc_roc(truth: &[bool], scores: &[f64]) -> f64 {
    let mut pairs: Vec<(bool, f64)> = truth.iter().copied().zip(scores.iter().copied()).collect();
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let n_pos = pairs.iter().filter(|(l, _)| *l).count() as f64;
    let n_neg = pairs.len() as f64 - n_pos;

    if n_pos == 0.0 || n_neg == 0.0 {
        return 0.5;
    }

    let mut tpr_prev = 0.0;
    let mut fpr_prev = 0.0;
    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut auc = 0.0;

    let mut start = 0;
    while start < pairs.len() {
        let score = pairs[start].1;
        let end = start + pairs[start..].iter().take_while(|(_, s)| *s == score).count();
        for (label, _) in &pairs[start..end] {
            if *label {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
        }
        start = end;

        let tpr = tp / n_pos;
        let fpr = fp / n_neg;
        auc += (fpr - fpr_prev) * (tpr + tpr_prev) / 2.0;

        tpr_prev = tpr;
        fpr_prev = fpr;
    }

    auc
}

fn check_lengths(truth: usize, predicted: usize) -> Result<()> {
    if truth != predicted {
        return Err(EvalError::range(
            "predictions",
            format!("{} predictions for {} true values", predicted, truth),
        ));
    }
    Ok(())
}

fn binary_truth(values: &[f64]) -> Result<Vec<bool>> {
    binary_labels("true label", values)
}

fn binary_labels(what: &str, values: &[f64]) -> Result<Vec<bool>> {
    values
        .iter()
        .map(|&v| {
            if v == 1.0 {
                Ok(true)
            } else if v == 0.0 {
                Ok(false)
            } else {
                Err(EvalError::range(what, format!("{} is not a 0/1 label", v)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamping_before_mse() {
        let clamp = ClampRange::default();
        let m = regression_metrics(&[10.0], &[-5.0], &clamp).unwrap();
        assert!((m.mse - 100.0).abs() < 1e-12);
        assert_eq!(m.clamped, 1);

        let m = regression_metrics(&[90.0, 50.0], &[130.0, 50.0], &clamp).unwrap();
        assert!((m.mse - 50.0).abs() < 1e-12);
        assert!((m.mae - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_evaluator_regression() {
        let evaluator = Evaluator::new(EvalOptions::default()).unwrap();
        let result = evaluator
            .evaluate("ols", TaskType::Regression, &[10.0, 20.0], &Predictions::continuous(vec![-5.0, 22.0]))
            .unwrap();

        assert_eq!(result.algorithm, "ols");
        assert!((result.primary_metric() - 52.0).abs() < 1e-12);
        assert!(!result.higher_is_better());
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let truth = [true, true, false, false, false];
        let predicted = [true, false, true, false, false];
        let cm = ConfusionMatrix::from_labels(&predicted, &truth);

        assert_eq!((cm.tp, cm.fn_, cm.fp, cm.tn), (1, 1, 1, 2));
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
        assert!((cm.type_i_error() - 1.0 / 3.0).abs() < 1e-12);
        assert!((cm.type_ii_error() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_and_inverted_mcc() {
        let truth = [true, true, false, false];
        let cm = ConfusionMatrix::from_labels(&truth, &truth);
        assert!((cm.mcc() - 1.0).abs() < 1e-9);

        let inverted = [false, false, true, true];
        let cm = ConfusionMatrix::from_labels(&inverted, &truth);
        assert!((cm.mcc() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_probability_thresholding() {
        let evaluator = Evaluator::new(EvalOptions::default().with_threshold(0.3)).unwrap();
        let result = evaluator
            .evaluate(
                "logit",
                TaskType::Classification,
                &[1.0, 0.0, 0.0],
                &Predictions::probabilities(vec![0.35, 0.31, 0.1]),
            )
            .unwrap();

        let m = result.classification().unwrap();
        assert_eq!(m.threshold, Some(0.3));
        assert_eq!(m.confusion_matrix.tp, 1);
        assert_eq!(m.confusion_matrix.fp, 1);
        assert_eq!(m.confusion_matrix.tn, 1);
        assert!(m.auc_roc.is_some());
    }

    #[test]
    fn test_hard_labels_ignore_threshold() {
        let evaluator = Evaluator::new(EvalOptions::default().with_threshold(0.9)).unwrap();
        let result = evaluator
            .evaluate(
                "lda",
                TaskType::Classification,
                &[1.0, 0.0],
                &Predictions::labels(vec![1.0, 0.0]),
            )
            .unwrap();

        let m = result.classification().unwrap();
        assert_eq!(m.threshold, None);
        assert!((m.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_and_bad_labels() {
        let evaluator = Evaluator::default();
        assert!(evaluator
            .evaluate("x", TaskType::Regression, &[1.0], &Predictions::continuous(vec![]))
            .is_err());
        assert!(evaluator
            .evaluate("x", TaskType::Classification, &[2.0], &Predictions::labels(vec![1.0]))
            .is_err());
        assert!(evaluator
            .evaluate("x", TaskType::Regression, &[1.0], &Predictions::labels(vec![1.0]))
            .is_err());
    }

    #[test]
    fn test_invalid_options() {
        assert!(Evaluator::new(EvalOptions::default().with_threshold(1.5)).is_err());
        let bad_clamp = EvalOptions {
            clamp: ClampRange { min: 100.0, max: 0.0 },
            ..EvalOptions::default()
        };
        assert!(matches!(Evaluator::new(bad_clamp), Err(EvalError::InvalidRange { .. })));
    }

    #[test]
    fn test_threshold_tradeoff_fixture() {
        let truth = [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let probs = [0.9, 0.6, 0.4, 0.2, 0.7, 0.45, 0.3, 0.26, 0.1, 0.05];

        let sweep = threshold_sweep(&truth, &probs, &[0.25, 0.5]).unwrap();
        let (low, high) = (&sweep[0], &sweep[1]);

        assert!(high.type_i_error <= low.type_i_error);
        assert!(high.type_ii_error >= low.type_ii_error);
        assert!((low.type_i_error - 4.0 / 6.0).abs() < 1e-12);
        assert!((high.type_i_error - 1.0 / 6.0).abs() < 1e-12);
        assert!((low.type_ii_error - 1.0 / 4.0).abs() < 1e-12);
        assert!((high.type_ii_error - 2.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_select_threshold() {
        let truth = [1.0, 1.0, 0.0, 0.0];
        let probs = [0.45, 0.8, 0.3, 0.1];
        let chosen = select_threshold(&truth, &probs, &[0.5, 0.4, 0.2]).unwrap();
        assert!((chosen - 0.4).abs() < 1e-12);

        assert!(select_threshold(&truth, &probs, &[]).is_err());
    }

    #[test]
    fn test_auc_perfect() {
        let auc = auc_roc(&[true, true, false, false], &[0.9, 0.8, 0.2, 0.1]);
        assert!((auc - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_auc_ties_do_not_depend_on_row_order() {
        // every score tied: no ranking information at all
        let flat = auc_roc(&[true, false, true, false], &[0.5, 0.5, 0.5, 0.5]);
        assert!((flat - 0.5).abs() < 1e-12);

        let a = auc_roc(&[true, false, false, true], &[0.9, 0.6, 0.6, 0.6]);
        let b = auc_roc(&[true, true, false, false], &[0.9, 0.6, 0.6, 0.6]);
        assert!((a - b).abs() < 1e-12);
        // 0.9 outranks both negatives, 0.6 ties both: 3 of 4 pairs
        assert!((a - 0.75).abs() < 1e-12, "auc {}", a);
    }

    proptest! {
        #[test]
        fn prop_raising_threshold_trades_type_i_for_type_ii(
            rows in prop::collection::vec((any::<bool>(), 0.0f64..=1.0), 1..80),
            lo in 0.0f64..=1.0,
            hi in 0.0f64..=1.0,
        ) {
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            let truth: Vec<f64> = rows.iter().map(|(t, _)| if *t { 1.0 } else { 0.0 }).collect();
            let probs: Vec<f64> = rows.iter().map(|(_, p)| *p).collect();

            let sweep = threshold_sweep(&truth, &probs, &[lo, hi]).unwrap();
            prop_assert!(sweep[1].type_i_error <= sweep[0].type_i_error);
            prop_assert!(sweep[1].type_ii_error >= sweep[0].type_ii_error);
        }

        #[test]
        fn prop_clamped_error_never_exceeds_raw(truth in 0.0f64..=100.0, raw in -500.0f64..600.0) {
            let m = regression_metrics(&[truth], &[raw], &ClampRange::default()).unwrap();
            prop_assert!(m.mse <= (raw - truth).powi(2) + 1e-9);
        }
    }
}
