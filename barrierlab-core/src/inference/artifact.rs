//! Persisted model artifact (JSON).
//!
//! Layout: `{ schema_version, version, created_at, feature_names, model }`.
//! `version` is a BLAKE3 digest over the feature names and model parameters,
//! so two artifacts with the same version score identically. Writes are
//! atomic: write to `.tmp`, then rename into place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::model::CalibratedLogistic;
use super::ModelArtifact;

/// Highest artifact schema this build understands.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("artifact I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported artifact schema version {found} (max supported: {max})")]
    UnsupportedSchema { found: u32, max: u32 },

    #[error("artifact lists {names} feature names but the model expects {expected}")]
    FeatureCountMismatch { names: usize, expected: usize },

    #[error("artifact model parameters are inconsistent or non-finite")]
    InvalidModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub schema_version: u32,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub model: CalibratedLogistic,
}

impl ArtifactFile {
    pub fn new(feature_names: Vec<String>, model: CalibratedLogistic) -> Self {
        let version = Self::compute_version(&feature_names, &model);
        Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            version,
            created_at: Utc::now(),
            feature_names,
            model,
        }
    }

    /// Deterministic BLAKE3 digest over feature names and model parameters.
    pub fn compute_version(feature_names: &[String], model: &CalibratedLogistic) -> String {
        let mut hasher = blake3::Hasher::new();
        for name in feature_names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }
        // Serializing finite f64 values is deterministic.
        let json = serde_json::to_vec(model).unwrap_or_default();
        hasher.update(&json);
        hasher.finalize().to_hex().to_string()
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.schema_version > ARTIFACT_SCHEMA_VERSION {
            return Err(ArtifactError::UnsupportedSchema {
                found: self.schema_version,
                max: ARTIFACT_SCHEMA_VERSION,
            });
        }
        if self.feature_names.len() != self.model.n_features() {
            return Err(ArtifactError::FeatureCountMismatch {
                names: self.feature_names.len(),
                expected: self.model.n_features(),
            });
        }
        if !self.model.is_consistent() {
            return Err(ArtifactError::InvalidModel);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let file: ArtifactFile = serde_json::from_str(json)?;
        file.validate()?;
        Ok(file)
    }

    /// Validate and write atomically.
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        self.validate()?;
        let json = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| ArtifactError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ArtifactError::NotFound(path.to_path_buf())
            } else {
                ArtifactError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_json(&json)
    }

    pub fn into_artifact(self) -> ModelArtifact {
        ModelArtifact::new(self.version, self.feature_names, Box::new(self.model))
    }
}
