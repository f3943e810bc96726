// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Interpretability output attached to fitted models
//!
//! Provides:
//! - Coefficient tables with standard errors, test statistics and p-values
//! - Feature importance rankings for tree ensembles
//! - Selected hyperparameters and predictors actually used
//! - Student-t and normal tail probabilities for significance tests

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One estimated term of a linear-family model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub term: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    /// t (OLS) or z (logistic Wald) statistic
    pub statistic: Option<f64>,
    /// Two-sided p-value for H0: coefficient = 0
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    pub rows: Vec<CoefficientRow>,
    /// "t" or "z"
    pub statistic_name: String,
    pub residual_df: Option<usize>,
}

impl CoefficientTable {
    pub fn get(&self, term: &str) -> Option<&CoefficientRow> {
        self.rows.iter().find(|r| r.term == term)
    }

    /// Terms (intercept excluded) with p-value below `alpha`
    pub fn significant(&self, alpha: f64) -> Vec<&CoefficientRow> {
        self.rows
            .iter()
            .filter(|r| r.term != "(intercept)")
            .filter(|r| r.p_value.is_some_and(|p| p < alpha))
            .collect()
    }

    pub fn format(&self) -> String {
        let mut out = format!(
            "{:<22} {:>12} {:>12} {:>10} {:>10}\n",
            "Term",
            "Estimate",
            "Std. Error",
            format!("{} value", self.statistic_name),
            "Pr(>|.|)"
        );
        for row in &self.rows {
            let fmt_opt = |v: Option<f64>, prec: usize| {
                v.map_or("-".to_string(), |x| format!("{:.*}", prec, x))
            };
            out.push_str(&format!(
                "{:<22} {:>12.5} {:>12} {:>10} {:>10}{}\n",
                row.term,
                row.estimate,
                fmt_opt(row.std_error, 5),
                fmt_opt(row.statistic, 3),
                row.p_value.map_or("-".to_string(), |p| format!("{:.2e}", p)),
                significance_stars(row.p_value),
            ));
        }
        out
    }
}

fn significance_stars(p: Option<f64>) -> &'static str {
    match p {
        Some(p) if p < 0.001 => " ***",
        Some(p) if p < 0.01 => " **",
        Some(p) if p < 0.05 => " *",
        Some(p) if p < 0.1 => " .",
        _ => "",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Share of total impurity decrease, sums to 1 across features
    pub importance: f64,
}

/// Everything an adapter can say about its fitted parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub coefficients: Option<CoefficientTable>,
    /// Sorted most important first
    pub feature_importance: Vec<FeatureImportance>,
    /// Hyperparameters in effect, including CV-selected ones
    pub hyperparameters: BTreeMap<String, f64>,
    /// Predictors with non-zero influence on the fitted model
    pub features_used: Vec<String>,
    pub notes: Vec<String>,
    /// Rows the solver actually trained on (after any subsampling)
    pub training_rows: usize,
}

impl ModelSummary {
    pub fn top_features(&self, n: usize) -> Vec<&FeatureImportance> {
        self.feature_importance.iter().take(n).collect()
    }

    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Training rows: {}\n", self.training_rows));

        if !self.hyperparameters.is_empty() {
            out.push_str("Hyperparameters:\n");
            for (name, value) in &self.hyperparameters {
                out.push_str(&format!("  {} = {}\n", name, value));
            }
        }
        if let Some(ref table) = self.coefficients {
            out.push_str("\nCoefficients:\n");
            out.push_str(&table.format());
        }
        if !self.feature_importance.is_empty() {
            out.push_str("\nFeature importance:\n");
            for fi in &self.feature_importance {
                out.push_str(&format!("  {:<20} {:.4}\n", fi.feature, fi.importance));
            }
        }
        if !self.features_used.is_empty() {
            out.push_str(&format!("\nPredictors used: {}\n", self.features_used.join(", ")));
        }
        for note in &self.notes {
            out.push_str(&format!("Note: {}\n", note));
        }
        out
    }
}

/// Builder for constructing summaries
#[derive(Debug, Default)]
pub struct ModelSummaryBuilder {
    summary: ModelSummary,
}

impl ModelSummaryBuilder {
    pub fn new(training_rows: usize) -> Self {
        Self {
            summary: ModelSummary {
                training_rows,
                ..Default::default()
            },
        }
    }

    pub fn with_coefficients(mut self, table: CoefficientTable) -> Self {
        self.summary.coefficients = Some(table);
        self
    }

    /// Raw importances are normalized to shares and sorted descending
    pub fn with_importance(mut self, raw: Vec<(String, f64)>) -> Self {
        let total: f64 = raw.iter().map(|(_, v)| v.max(0.0)).sum();
        let mut ranked: Vec<FeatureImportance> = raw
            .into_iter()
            .map(|(feature, v)| FeatureImportance {
                feature,
                importance: if total > 0.0 { v.max(0.0) / total } else { 0.0 },
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.summary.feature_importance = ranked;
        self
    }

    pub fn with_hyperparameter(mut self, name: &str, value: f64) -> Self {
        self.summary.hyperparameters.insert(name.to_string(), value);
        self
    }

    pub fn with_features_used(mut self, features: Vec<String>) -> Self {
        self.summary.features_used = features;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.summary.notes.push(note.into());
        self
    }

    pub fn build(self) -> ModelSummary {
        self.summary
    }
}

/// Two-sided p-value of a Student-t statistic with `df` degrees of freedom
pub fn student_t_p_value(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    if df <= 0.0 {
        return f64::NAN;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Two-sided p-value of a standard-normal statistic
pub fn normal_p_value(z: f64) -> f64 {
    if !z.is_finite() {
        return 0.0;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2).clamp(0.0, 1.0)
}

/// Complementary error function, Chebyshev fit with fractional error below 1.2e-7
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

fn ln_gamma(x: f64) -> f64 {
    // Lanczos, g = 7
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEF[0];
    let t = x + 7.5;
    for (i, &c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// I_x(a, b) via the Lentz continued fraction
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-14;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_p_values_match_tables() {
        // t = 2.228 is the 97.5% quantile at 10 df
        assert!((student_t_p_value(2.228, 10.0) - 0.05).abs() < 1e-3);
        // t = 1.96 with many df approaches the normal
        assert!((student_t_p_value(1.96, 1e5) - 0.05).abs() < 1e-3);
        assert!((student_t_p_value(0.0, 5.0) - 1.0).abs() < 1e-9);
        assert!(student_t_p_value(50.0, 30.0) < 1e-20);
    }

    #[test]
    fn test_normal_p_values() {
        assert!((normal_p_value(1.959_964) - 0.05).abs() < 1e-5);
        assert!((normal_p_value(-2.575_829) - 0.01).abs() < 1e-5);
        assert!((normal_p_value(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_importance_normalized_and_sorted() {
        let summary = ModelSummaryBuilder::new(10)
            .with_importance(vec![
                ("year".to_string(), 3.0),
                ("energy".to_string(), 1.0),
                ("tempo".to_string(), 0.0),
            ])
            .build();

        assert_eq!(summary.feature_importance[0].feature, "year");
        assert!((summary.feature_importance[0].importance - 0.75).abs() < 1e-12);
        let total: f64 = summary.feature_importance.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(summary.top_features(1).len(), 1);
    }

    #[test]
    fn test_significant_terms_skip_intercept() {
        let row = |term: &str, p: f64| CoefficientRow {
            term: term.to_string(),
            estimate: 1.0,
            std_error: Some(0.1),
            statistic: Some(10.0),
            p_value: Some(p),
        };
        let table = CoefficientTable {
            rows: vec![row("(intercept)", 1e-9), row("year", 1e-6), row("tempo", 0.4)],
            statistic_name: "t".to_string(),
            residual_df: Some(50),
        };

        let significant: Vec<&str> = table.significant(0.05).iter().map(|r| r.term.as_str()).collect();
        assert_eq!(significant, vec!["year"]);
        assert!(table.format().contains("year"));
    }
}
