// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Standalone adapter runner
//!
//! Fits one adapter on the shared split and prints its metrics and model summary

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use track_eval::adapters::{all_adapters, find_adapter, AdapterSettings};
use track_eval::datasets::{synthetic_tracks, RawTable, SyntheticSpec};
use track_eval::features::FeatureDeriver;
use track_eval::metrics::{threshold_sweep, EvalOptions, Evaluator, OutputKind, TaskType};
use track_eval::pipeline::{CLASSIFICATION_TARGET, REGRESSION_TARGET};
use track_eval::split::DatasetSplitter;
use track_eval::FitOptions;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "run-adapter")]
#[command(about = "Fit and score a single model adapter")]
#[command(version)]
struct Args {
    /// Adapter to run (see --list)
    #[arg(short, long)]
    model: Option<String>,

    /// Track CSV (omit to use the synthetic catalogue)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Random seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of rows for the synthetic catalogue
    #[arg(short, long, default_value_t = 1000)]
    num_rows: usize,

    /// Target column (defaults to popularity or explicit by task)
    #[arg(short, long)]
    target: Option<String>,

    /// Probability threshold for classification
    #[arg(long, default_value_t = 0.5)]
    threshold: f64,

    /// Comma-separated thresholds for the sweep
    #[arg(long, default_value = "0.25,0.3,0.35,0.4,0.45,0.5")]
    sweep: String,

    /// List available adapters
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = AdapterSettings::default();

    // List available adapters
    if args.list {
        println!("Available adapters:");
        println!("-------------------");
        for adapter in all_adapters(&settings) {
            println!("  {:<24} [{}] {}", adapter.name(), adapter.task(), adapter.description());
        }
        return Ok(());
    }

    let Some(ref name) = args.model else {
        bail!("--model is required unless --list is given");
    };
    let adapter = find_adapter(name, &settings).with_context(|| format!("unknown adapter '{}'", name))?;

    // Load tracks
    let tracks = match args.input {
        Some(ref path) => {
            let raw = RawTable::from_csv_path(path).with_context(|| format!("reading {}", path.display()))?;
            FeatureDeriver::parse_tracks(&raw)?
        }
        None => {
            tracing::info!("Generating synthetic catalogue ({} rows, seed={})", args.num_rows, args.seed);
            synthetic_tracks(args.num_rows, args.seed, &SyntheticSpec::default())?
        }
    };
    let dataset = FeatureDeriver::derive_tracks(&tracks)?;
    let split = DatasetSplitter::split(dataset.n_rows(), 0.8, args.seed)?;
    let train = dataset.select_rows(split.train());
    let test = dataset.select_rows(split.test());

    let target = args.target.clone().unwrap_or_else(|| {
        match adapter.task() {
            TaskType::Regression => REGRESSION_TARGET,
            TaskType::Classification => CLASSIFICATION_TARGET,
        }
        .to_string()
    });

    println!("\nDataset: {} rows", dataset.n_rows());
    println!("  Train rows: {}", train.n_rows());
    println!("  Test rows: {}", test.n_rows());

    println!("\n{}", "=".repeat(70));
    println!("{} -> {}", adapter.name(), target);
    println!("{}", adapter.description());
    println!("{}", "=".repeat(70));

    let options = FitOptions {
        seed: args.seed,
        ..FitOptions::default()
    };
    let fitted = adapter.fit(&train, &target, &options)?;
    let predictions = adapter.predict(&fitted, &test)?;
    let truth: Vec<f64> = test
        .column(&target)
        .map(|c| c.to_vec())
        .with_context(|| format!("target '{}' missing from test rows", target))?;

    let evaluator = Evaluator::new(EvalOptions::default().with_threshold(args.threshold))?;
    let result = evaluator.evaluate(adapter.name(), adapter.task(), &truth, &predictions)?;
    println!("{}", result.format());

    println!("Model Summary");
    println!("{}", "-".repeat(50));
    println!("{}", fitted.summary().format());

    if predictions.kind == OutputKind::Probability {
        let thresholds = args
            .sweep
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .context("parsing --sweep")?;
        let sweep = threshold_sweep(&truth, &predictions.values, &thresholds)?;

        println!("Threshold Sweep");
        println!("{}", "-".repeat(50));
        println!("{:>10} {:>10} {:>10} {:>10}", "Threshold", "Accuracy", "Type I", "Type II");
        for point in sweep {
            println!(
                "{:>10.2} {:>10.4} {:>10.4} {:>10.4}",
                point.threshold, point.accuracy, point.type_i_error, point.type_ii_error
            );
        }
    }

    println!("\nEvaluation complete!");

    Ok(())
}
