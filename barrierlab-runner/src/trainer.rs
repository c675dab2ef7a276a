//! Training runner: bars in, persisted artifact and metadata out.
//!
//! Pipeline:
//! 1. Build the training set (features + labels, excluded rows removed)
//! 2. Time-series cross-validation for an out-of-fold AUC
//! 3. Isotonic calibration fitted on the out-of-fold scores
//! 4. Final fit on every row, calibration attached
//! 5. Artifact + `<stem>.meta.json` sidecar

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use barrierlab_core::data::{load_bars_csv, DataError};
use barrierlab_core::domain::Bar;
use barrierlab_core::features::FeatureError;
use barrierlab_core::inference::{ArtifactError, ArtifactFile};
use barrierlab_core::labels::LabelSummary;

use crate::calibration::fit_isotonic;
use crate::config::{ConfigError, TrainConfig};
use crate::dataset::build_training_set;
use crate::fit::fit_model;
use crate::metadata::{meta_path, TrainingMeta};
use crate::validation::{cross_validate, time_series_splits, CrossValidation};

/// Errors from the training runner.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("feature error: {0}")]
    Features(#[from] FeatureError),
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("not enough labeled rows: {rows} < {needed}")]
    InsufficientRows { rows: usize, needed: usize },
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a training run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub artifact: ArtifactFile,
    pub meta: TrainingMeta,
    pub cv: CrossValidation,
    pub summary: LabelSummary,
    /// Class-1 rows in the training set.
    pub positives: usize,
}

/// Short, printable summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub rows: usize,
    pub positives: usize,
    pub auc_cv: Option<f64>,
    pub mean_fold_auc: Option<f64>,
    pub calibrated: bool,
    pub artifact_version: String,
    pub labels: LabelSummary,
}

impl TrainReport {
    pub fn summary(&self) -> TrainSummary {
        TrainSummary {
            rows: self.meta.rows,
            positives: self.positives,
            auc_cv: self.meta.auc_cv,
            mean_fold_auc: self.cv.mean_fold_auc(),
            calibrated: self.artifact.model.calibration.is_some(),
            artifact_version: self.artifact.version.clone(),
            labels: self.summary,
        }
    }
}

/// Train in memory. Nothing is written.
pub fn train(bars: &[Bar], config: &TrainConfig) -> Result<TrainReport, TrainError> {
    config.validate()?;
    let set = build_training_set(bars, config)?;

    let folds = time_series_splits(set.len(), config.validation.n_splits)?;
    let cv = cross_validate(&set.x, &set.y, &folds, &config.fit);
    let auc_cv = cv.pooled_auc();
    match auc_cv {
        Some(auc) => info!(auc, folds = folds.len(), "cross-validation done"),
        None => warn!("out-of-fold labels hold a single class; AUC undefined"),
    }

    let mut model = fit_model(&set.x, &set.y, &config.fit);
    if config.validation.calibrate {
        model.calibration = fit_isotonic(&cv.oof_scores, &cv.oof_labels);
    }

    let artifact = ArtifactFile::new(set.feature_names.clone(), model);
    artifact.validate()?;

    let meta = TrainingMeta {
        timeframe: config.timeframe.clone(),
        horizon: config.labels.horizon,
        atr_period: config.features.atr_period,
        k_sl: config.labels.k_sl,
        k_tp: config.labels.k_tp,
        features: set.feature_names.clone(),
        auc_cv,
        rows: set.len(),
        artifact_version: artifact.version.clone(),
        created_at: Utc::now(),
    };

    Ok(TrainReport {
        artifact,
        meta,
        cv,
        summary: set.summary,
        positives: set.positives(),
    })
}

/// Read bars from a CSV file (per `config.ingest`) and train in memory.
pub fn train_from_csv(csv_path: &Path, config: &TrainConfig) -> Result<TrainReport, TrainError> {
    let bars = load_bars_csv(csv_path, &config.ingest_options()?)?;
    info!(path = %csv_path.display(), bars = bars.len(), "bars loaded");
    train(&bars, config)
}

/// Persist the artifact and its metadata sidecar.
pub fn save_report(report: &TrainReport, artifact_path: &Path) -> Result<PathBuf, TrainError> {
    report.artifact.save(artifact_path)?;
    let meta_file = meta_path(artifact_path);
    report.meta.save(&meta_file)?;
    info!(
        artifact = %artifact_path.display(),
        meta = %meta_file.display(),
        version = %report.artifact.version,
        "model saved"
    );
    Ok(meta_file)
}

/// Train and persist in one step.
pub fn run_training(
    bars: &[Bar],
    config: &TrainConfig,
    artifact_path: &Path,
) -> Result<TrainReport, TrainError> {
    let report = train(bars, config)?;
    save_report(&report, artifact_path)?;
    Ok(report)
}
