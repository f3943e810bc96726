// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

use ndarray::{Array1, Array2};
use track_eval::adapters::{
    CategoricalEncoding, DesignSpec, FitOptions, FittedModel, LinearRegression, LogisticRegression, ModelAdapter,
    Predictor,
};
use track_eval::datasets::{synthetic_tracks, RawTable, SyntheticSpec};
use track_eval::error::{EvalError, Result};
use track_eval::features::{FeatureDeriver, ModelDataset};
use track_eval::interpret::ModelSummary;
use track_eval::metrics::{EvalOptions, Evaluator, OutputKind, TaskType};
use track_eval::pipeline::{
    ComparisonRunner, DatasetSource, EvaluationConfig, EvaluationPipeline, CLASSIFICATION_TARGET, REGRESSION_TARGET,
};
use track_eval::split::DatasetSplitter;

#[test]
fn linear_regression_recovers_year_slope() {
    let spec = SyntheticSpec {
        intercept: 15.0,
        year_slope: 0.5,
        noise_sd: 2.0,
    };
    let tracks = synthetic_tracks(100, 2024, &spec).unwrap();
    let dataset = FeatureDeriver::derive_tracks(&tracks).unwrap();
    let split = DatasetSplitter::split(dataset.n_rows(), 0.8, 2024).unwrap();
    let train = dataset.select_rows(split.train());
    let test = dataset.select_rows(split.test());

    let adapter = LinearRegression::new();
    let fitted = adapter.fit(&train, REGRESSION_TARGET, &FitOptions::default()).unwrap();

    let year = fitted
        .summary()
        .coefficients
        .as_ref()
        .and_then(|t| t.get("year"))
        .expect("year coefficient");
    assert!((year.estimate - 0.5).abs() < 0.05, "slope {}", year.estimate);

    let predictions = adapter.predict(&fitted, &test).unwrap();
    let truth = test.column(REGRESSION_TARGET).unwrap().to_vec();
    let result = Evaluator::new(EvalOptions::default())
        .unwrap()
        .evaluate(adapter.name(), TaskType::Regression, &truth, &predictions)
        .unwrap();

    // noise variance is 4; allow for estimation error on 20 held-out rows
    let mse = result.primary_metric();
    assert!(mse > 1.0 && mse < 12.0, "held-out MSE {}", mse);
}

/// Delegates to OLS but always asks for a column the table does not have
struct MissingTargetAdapter {
    inner: LinearRegression,
}

impl ModelAdapter for MissingTargetAdapter {
    fn name(&self) -> &str {
        "MissingTarget"
    }

    fn description(&self) -> &str {
        "OLS pointed at a nonexistent column"
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
        self.inner.fit_design(x, y, design, options)
    }

    fn fit(&self, train: &ModelDataset, _target: &str, options: &FitOptions) -> Result<FittedModel> {
        self.inner.fit(train, "chart_position", options)
    }
}

#[test]
fn runner_records_failure_without_aborting() {
    let config = EvaluationConfig::default();
    let tracks = synthetic_tracks(200, 11, &config.synthetic).unwrap();
    let dataset = FeatureDeriver::derive_tracks(&tracks).unwrap();
    let split = DatasetSplitter::split(dataset.n_rows(), 0.8, 11).unwrap();

    let adapters: Vec<Box<dyn ModelAdapter>> = vec![
        Box::new(MissingTargetAdapter {
            inner: LinearRegression::new(),
        }),
        Box::new(LinearRegression::new()),
    ];
    let runner = ComparisonRunner::new(&config).unwrap();
    let entries = runner.run(&dataset, &split, &adapters, REGRESSION_TARGET);

    assert_eq!(entries.len(), 2);
    assert!(entries[0].succeeded());
    assert_eq!(entries[0].algorithm, "LinearRegression");
    assert!(!entries[1].succeeded());
    assert_eq!(entries[1].algorithm, "MissingTarget");
    assert!(entries[1].error.as_ref().unwrap().contains("chart_position"));
}

#[test]
fn csv_source_matches_synthetic_source() {
    let base = EvaluationConfig {
        synthetic_rows: 250,
        adapter_names: vec!["LinearRegression".to_string(), "LogisticRegression".to_string()],
        ..EvaluationConfig::default()
    };

    let tracks = synthetic_tracks(base.synthetic_rows, base.seed, &base.synthetic).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracks.csv");
    RawTable::from_tracks(&tracks).write_csv(&path).unwrap();

    let from_memory = EvaluationPipeline::new(base.clone()).run().unwrap();
    let from_csv = EvaluationPipeline::new(EvaluationConfig {
        source: DatasetSource::Csv {
            path: path.to_string_lossy().to_string(),
        },
        ..base
    })
    .run()
    .unwrap();

    for (a, b) in from_memory.tasks.iter().zip(&from_csv.tasks) {
        assert_eq!(a.target, b.target);
        let ma: Vec<Option<f64>> = a.entries.iter().map(|e| e.primary_metric()).collect();
        let mb: Vec<Option<f64>> = b.entries.iter().map(|e| e.primary_metric()).collect();
        for (x, y) in ma.iter().zip(&mb) {
            let (x, y) = (x.unwrap(), y.unwrap());
            assert!((x - y).abs() < 1e-9, "{} vs {}", x, y);
        }
    }
    assert_eq!(from_csv.tasks.len(), 2);
    assert_eq!(from_csv.tasks[1].target, CLASSIFICATION_TARGET);
}

#[test]
fn missing_csv_column_aborts_with_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    std::fs::write(&path, "id,artists,name\nx,['A'],Song\n").unwrap();

    let config = EvaluationConfig {
        source: DatasetSource::Csv {
            path: path.to_string_lossy().to_string(),
        },
        ..EvaluationConfig::default()
    };
    match EvaluationPipeline::new(config).run() {
        Err(err @ EvalError::Schema { .. }) => assert!(err.is_fatal()),
        other => panic!("expected schema error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn logistic_threshold_tradeoff_on_held_out_rows() {
    let tracks = synthetic_tracks(600, 99, &SyntheticSpec::default()).unwrap();
    let dataset = FeatureDeriver::derive_tracks(&tracks).unwrap();
    let split = DatasetSplitter::split(dataset.n_rows(), 0.8, 99).unwrap();
    let train = dataset.select_rows(split.train());
    let test = dataset.select_rows(split.test());

    let adapter = LogisticRegression::new();
    let fitted = adapter.fit(&train, CLASSIFICATION_TARGET, &FitOptions::default()).unwrap();
    let probabilities = adapter.predict(&fitted, &test).unwrap();
    let truth = test.column(CLASSIFICATION_TARGET).unwrap().to_vec();

    let low = Evaluator::new(EvalOptions::default().with_threshold(0.25))
        .unwrap()
        .evaluate(adapter.name(), TaskType::Classification, &truth, &probabilities)
        .unwrap();
    let high = Evaluator::new(EvalOptions::default().with_threshold(0.5))
        .unwrap()
        .evaluate(adapter.name(), TaskType::Classification, &truth, &probabilities)
        .unwrap();

    let low = low.classification().unwrap();
    let high = high.classification().unwrap();
    assert!(high.type_i_error <= low.type_i_error);
    assert!(high.type_ii_error >= low.type_ii_error);
    assert_eq!(low.confusion_matrix.total(), test.n_rows());
}
