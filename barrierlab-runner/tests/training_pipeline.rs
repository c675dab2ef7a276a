//! Integration tests for the training runner.
//!
//! Covers the full path: bars → training set → cross-validation →
//! calibrated artifact + metadata on disk → served predictions.

use chrono::{Duration, TimeZone, Utc};
use std::fmt::Write as _;
use std::fs;

use barrierlab_core::domain::Bar;
use barrierlab_core::features::{assemble_features, FeatureConfig, FEATURE_NAMES};
use barrierlab_core::inference::{ArtifactFile, PredictRequest, Predictor};
use barrierlab_runner::{
    generate_synthetic_bars, meta_path, run_training, train, train_from_csv, TrainConfig,
    TrainError, TrainingMeta,
};

fn bars(n: usize, seed: &str) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
    generate_synthetic_bars(n, start, Duration::minutes(5), seed)
}

fn fast_config() -> TrainConfig {
    let mut config = TrainConfig::default();
    config.fit.epochs = 150;
    config
}

// ── Persistence ──────────────────────────────────────────────────────

#[test]
fn training_writes_artifact_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let artifact_path = dir.path().join("models").join("model_latest.json");
    let bars = bars(1500, "persist");

    let report = run_training(&bars, &fast_config(), &artifact_path).unwrap();

    assert!(artifact_path.exists());
    let meta_file = meta_path(&artifact_path);
    assert!(meta_file.exists());

    let meta = TrainingMeta::load(&meta_file).unwrap();
    assert_eq!(meta, report.meta);
    assert_eq!(meta.timeframe, "M5");
    assert_eq!((meta.horizon, meta.atr_period), (8, 14));
    assert_eq!((meta.k_sl, meta.k_tp), (1.0, 2.0));
    assert_eq!(meta.features, FEATURE_NAMES.map(String::from).to_vec());
    assert_eq!(meta.rows, 1500);
    assert_eq!(meta.artifact_version, report.artifact.version);
    if let Some(auc) = meta.auc_cv {
        assert!((0.0..=1.0).contains(&auc));
    }

    let loaded = ArtifactFile::load(&artifact_path).unwrap();
    assert_eq!(loaded.version, report.artifact.version);
    assert_eq!(loaded.feature_names, meta.features);
}

#[test]
fn served_predictions_are_probabilities() {
    let dir = tempfile::tempdir().unwrap();
    let artifact_path = dir.path().join("model.json");
    let bars = bars(1200, "serve");
    run_training(&bars, &fast_config(), &artifact_path).unwrap();

    let predictor = Predictor::load_or_neutral(&artifact_path).unwrap();
    assert!(predictor.is_loaded());
    assert_eq!(predictor.health().features.len(), FEATURE_NAMES.len());

    let frame = assemble_features(&bars, &FeatureConfig::default()).unwrap();
    for row in frame.rows.iter().rev().take(50) {
        let response = predictor.predict(&PredictRequest {
            features: row.to_map(),
            threshold: None,
        });
        assert!((0.0..=1.0).contains(&response.probability));
        assert_eq!(response.decision, u8::from(response.probability >= 0.5));
    }
}

#[test]
fn training_is_deterministic_apart_from_timestamps() {
    let bars = bars(800, "determinism");
    let a = train(&bars, &fast_config()).unwrap();
    let b = train(&bars, &fast_config()).unwrap();
    assert_eq!(a.artifact.version, b.artifact.version);
    assert_eq!(a.artifact.model, b.artifact.model);
    assert_eq!(a.cv, b.cv);
}

// ── Calibration and validation ───────────────────────────────────────

#[test]
fn calibration_toggle() {
    let bars = bars(800, "calibration");
    let calibrated = train(&bars, &fast_config()).unwrap();
    let summary = calibrated.summary();
    if summary.labels.wins > 0 && summary.labels.wins < summary.rows {
        assert!(summary.calibrated);
    }

    let mut config = fast_config();
    config.validation.calibrate = false;
    let raw = train(&bars, &config).unwrap();
    assert!(raw.artifact.model.calibration.is_none());
    assert_ne!(raw.artifact.version, calibrated.artifact.version);
}

#[test]
fn folds_follow_split_count() {
    let bars = bars(600, "folds");
    let mut config = fast_config();
    config.validation.n_splits = 3;
    let report = train(&bars, &config).unwrap();
    assert_eq!(report.cv.folds.len(), 3);
    // 600 rows, 3 splits: test blocks of 150.
    assert_eq!(report.cv.oof_scores.len(), 450);
    assert!(report.cv.folds.windows(2).all(|w| w[0].train_rows < w[1].train_rows));
}

#[test]
fn drop_truncated_shrinks_training_set() {
    let bars = bars(600, "truncated");
    let mut config = fast_config();
    config.labels.drop_truncated = true;
    let report = train(&bars, &config).unwrap();
    assert_eq!(report.meta.rows, 600 - 8);
}

// ── Failure modes ────────────────────────────────────────────────────

#[test]
fn too_few_bars_fails() {
    let err = train(&bars(10, "short"), &fast_config()).unwrap_err();
    assert!(matches!(err, TrainError::Features(_)));
}

#[test]
fn invalid_config_fails_before_work() {
    let mut config = fast_config();
    config.fit.learning_rate = 0.0;
    let err = train(&bars(300, "bad"), &config).unwrap_err();
    assert!(matches!(err, TrainError::Config(_)));
}

#[test]
fn csv_missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    fs::write(&path, "time,open,high,low,close\n2024-01-02 12:00,1,2,0.5,1.5\n").unwrap();
    let err = train_from_csv(&path, &fast_config()).unwrap_err();
    assert!(matches!(err, TrainError::Data(_)));
}

// ── CSV input ────────────────────────────────────────────────────────

#[test]
fn trains_from_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    let mut csv = String::from("time,open,high,low,close,volume\n");
    for bar in bars(500, "csv") {
        writeln!(
            csv,
            "{},{},{},{},{},{}",
            bar.timestamp.format("%Y.%m.%d %H:%M"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume.unwrap_or_default()
        )
        .unwrap();
    }
    fs::write(&path, csv).unwrap();

    let report = train_from_csv(&path, &fast_config()).unwrap();
    assert_eq!(report.meta.rows, 500);
}

#[test]
fn config_file_drives_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.toml");
    fs::write(
        &path,
        "timeframe = \"M15\"\n[labels]\nhorizon = 4\n[fit]\nepochs = 50\n[validation]\nn_splits = 2\n",
    )
    .unwrap();
    let config = TrainConfig::from_file(&path).unwrap();
    let report = train(&bars(400, "toml"), &config).unwrap();
    assert_eq!(report.meta.timeframe, "M15");
    assert_eq!(report.meta.horizon, 4);
    assert_eq!(report.cv.folds.len(), 2);
}
