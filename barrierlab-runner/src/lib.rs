//! BarrierLab Runner: training orchestration on top of `barrierlab-core`.
//!
//! This crate provides:
//! - TOML training configuration with validation
//! - Training-set construction (features + triple-barrier labels)
//! - Logistic fitting, time-series cross-validation, isotonic calibration
//! - Artifact and metadata persistence
//! - Synthetic bar generation and CSV export

pub mod calibration;
pub mod config;
pub mod dataset;
pub mod export;
pub mod fit;
pub mod metadata;
pub mod synthetic;
pub mod trainer;
pub mod validation;

pub use calibration::fit_isotonic;
pub use config::{ConfigError, TrainConfig};
pub use dataset::{build_training_set, label_bars, LabeledFrame, TrainingSet};
pub use export::{export_features_csv, export_labeled_csv};
pub use fit::{fit_model, FitConfig};
pub use metadata::{meta_path, TrainingMeta};
pub use synthetic::generate_synthetic_bars;
pub use trainer::{
    run_training, save_report, train, train_from_csv, TrainError, TrainReport, TrainSummary,
};
pub use validation::{
    cross_validate, roc_auc, time_series_splits, CrossValidation, FoldResult, FoldSpec,
    ValidationConfig,
};
