//! Training metadata sidecar, written next to the artifact as
//! `<stem>.meta.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::trainer::TrainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMeta {
    pub timeframe: String,
    pub horizon: usize,
    pub atr_period: usize,
    pub k_sl: f64,
    pub k_tp: f64,
    pub features: Vec<String>,
    /// Pooled out-of-fold ROC AUC; `None` when a single class was present.
    pub auc_cv: Option<f64>,
    pub rows: usize,
    pub artifact_version: String,
    pub created_at: DateTime<Utc>,
}

/// `models/model_latest.json` → `models/model_latest.meta.json`.
pub fn meta_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    artifact.with_file_name(format!("{stem}.meta.json"))
}

impl TrainingMeta {
    /// Atomic write: `.tmp` then rename.
    pub fn save(&self, path: &Path) -> Result<(), TrainError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TrainError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| TrainError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| TrainError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, TrainError> {
        let json = fs::read_to_string(path).map_err(|source| TrainError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrainingMeta {
        TrainingMeta {
            timeframe: "M5".into(),
            horizon: 8,
            atr_period: 14,
            k_sl: 1.0,
            k_tp: 2.0,
            features: vec!["dist_ema21".into(), "ret1".into()],
            auc_cv: Some(0.61),
            rows: 1234,
            artifact_version: "abc123".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn sidecar_path_uses_stem() {
        assert_eq!(
            meta_path(Path::new("models/model_latest.json")),
            PathBuf::from("models/model_latest.meta.json")
        );
        assert_eq!(meta_path(Path::new("m")), PathBuf::from("m.meta.json"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_latest.meta.json");
        let meta = sample();
        meta.save(&path).unwrap();
        assert_eq!(TrainingMeta::load(&path).unwrap(), meta);
    }

    #[test]
    fn undefined_auc_serializes_as_null() {
        let meta = TrainingMeta {
            auc_cv: None,
            ..sample()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"auc_cv\":null"));
    }
}
