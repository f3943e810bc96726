// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model comparison CLI for track popularity and explicit-content prediction
//!
//! Usage:
//!   track-eval --seed 42
//!   track-eval --input ./data/tracks.csv --adapters LinearRegression,LogisticRegression
//!   track-eval --config eval/config.json --format markdown

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use track_eval::metrics::TaskType;
use track_eval::pipeline::{primary_metric_name, DatasetSource, EvaluationConfig, EvaluationPipeline, ThresholdPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "track-eval")]
#[command(about = "Compare popularity and explicit-content models on a shared split")]
#[command(version)]
struct Args {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Track CSV (omit to use the synthetic catalogue)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Rows in the synthetic catalogue
    #[arg(long)]
    rows: Option<usize>,

    /// Fraction of rows used for training
    #[arg(long)]
    train_fraction: Option<f64>,

    /// Fixed probability threshold for classification
    #[arg(long, conflicts_with = "tune_threshold")]
    threshold: Option<f64>,

    /// Choose the threshold on a validation carve-out of the training rows
    #[arg(long)]
    tune_threshold: bool,

    /// Specific adapters to run (comma-separated, empty = all)
    #[arg(short, long)]
    adapters: Option<String>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (json, markdown, both)
    #[arg(short, long, default_value = "both")]
    format: String,
}

fn build_config(args: &Args) -> Result<EvaluationConfig> {
    let mut config = match &args.config {
        Some(path) => EvaluationConfig::from_json_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EvaluationConfig::default(),
    };

    if let Some(ref input) = args.input {
        config.source = DatasetSource::Csv {
            path: input.to_string_lossy().to_string(),
        };
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(rows) = args.rows {
        config.synthetic_rows = rows;
    }
    if let Some(fraction) = args.train_fraction {
        config.train_fraction = fraction;
    }
    if let Some(threshold) = args.threshold {
        config.threshold_policy = ThresholdPolicy::Fixed { threshold };
    }
    if args.tune_threshold {
        config.threshold_policy = ThresholdPolicy::Validated {
            grid: (1..=19).map(|i| i as f64 * 0.05).collect(),
            validation_fraction: 0.2,
        };
    }
    if let Some(ref names) = args.adapters {
        config.adapter_names = names
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(ref output) = args.output {
        config.output_dir = output.to_string_lossy().to_string();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    tracing::info!("Track Model Comparison Pipeline");
    tracing::info!("===============================");
    tracing::info!("Source: {:?}", config.source);
    tracing::info!("Seed: {}", config.seed);
    tracing::info!("Threshold policy: {:?}", config.threshold_policy);

    let output_dir = PathBuf::from(&config.output_dir);
    let report = EvaluationPipeline::new(config).run().context("comparison run failed")?;

    // Print summary to console
    println!("\n{}", "=".repeat(78));
    println!("COMPARISON SUMMARY");
    println!("{}", "=".repeat(78));
    for best in &report.summary.best {
        println!(
            "Best {} model ({}): {} ({}={:.4})",
            best.task, best.target, best.algorithm, best.metric, best.value
        );
    }

    for task in &report.tasks {
        println!("\n{} ({}):", task.task, task.target);
        println!("{:-<78}", "");
        match task.task {
            TaskType::Regression => println!(
                "{:<4} {:<24} {:>10} {:>10} {:>10} {:>10}",
                "#", "Model", "MSE", "RMSE", "MAE", "Clamped"
            ),
            TaskType::Classification => println!(
                "{:<4} {:<24} {:>10} {:>10} {:>10} {:>10}",
                "#", "Model", "Accuracy", "Type I", "Type II", "AUC-ROC"
            ),
        }
        println!("{:-<78}", "");

        for entry in &task.entries {
            let rank = entry.rank.map_or("-".to_string(), |r| r.to_string());
            let result = entry.result.as_ref();
            if let Some(m) = result.and_then(|r| r.regression()) {
                println!(
                    "{:<4} {:<24} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                    rank, entry.algorithm, m.mse, m.rmse, m.mae, m.clamped
                );
            } else if let Some(m) = result.and_then(|r| r.classification()) {
                let auc = m.auc_roc.map_or("-".to_string(), |v| format!("{:.4}", v));
                println!(
                    "{:<4} {:<24} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                    rank, entry.algorithm, m.accuracy, m.type_i_error, m.type_ii_error, auc
                );
            } else {
                println!(
                    "{:<4} {:<24} FAILED: {}",
                    rank,
                    entry.algorithm,
                    entry.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        println!("{:-<78}", "");
        println!("Ranked by {}", primary_metric_name(task.task));
    }

    // Save outputs
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let timestamp = report.timestamp.format("%Y%m%d_%H%M%S");

    if args.format == "json" || args.format == "both" {
        let json_path = output_dir.join(format!("comparison_{}.json", timestamp));
        report.save_json(&json_path)?;
        println!("\nJSON results saved to: {}", json_path.display());
    }

    if args.format == "markdown" || args.format == "both" {
        let md_path = output_dir.join(format!("comparison_{}.md", timestamp));
        report.save_markdown(&md_path)?;
        println!("Markdown report saved to: {}", md_path.display());
    }

    println!("\nComparison complete!");

    Ok(())
}
