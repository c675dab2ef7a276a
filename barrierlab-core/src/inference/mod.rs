//! Inference contract: feature mapping in, clamped probability out.
//!
//! A [`ModelArtifact`] pairs a [`Scorer`] with the ordered feature names it
//! was trained on. At serving time the request mapping is projected onto that
//! order: present keys keep their value, missing (or non-finite) keys become
//! 0.0, extra keys are ignored. The scorer output is clamped to [0, 1].
//!
//! A [`Predictor`] is built once at startup and only read afterwards; share
//! it by reference or `Arc`. Without an artifact it answers a neutral 0.5.

pub mod artifact;
pub mod model;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::features::FeatureMap;

pub use artifact::{ArtifactError, ArtifactFile, ARTIFACT_SCHEMA_VERSION};
pub use model::{CalibratedLogistic, IsotonicCurve, LogisticModel, Standardizer};

/// Probability returned when no artifact is loaded or the scorer yields NaN.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;
/// Decision threshold used when a request carries none.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Interface for trained scoring functions.
pub trait Scorer: Send + Sync {
    /// Probability of class 1 for a dense feature vector in artifact order.
    fn predict_proba(&self, x: &[f64]) -> f64;

    /// Model family name.
    fn name(&self) -> &str;
}

/// Immutable bundle of a scorer and its ordered feature names.
pub struct ModelArtifact {
    version: String,
    feature_names: Vec<String>,
    scorer: Box<dyn Scorer>,
}

impl ModelArtifact {
    pub fn new(
        version: impl Into<String>,
        feature_names: Vec<String>,
        scorer: Box<dyn Scorer>,
    ) -> Self {
        Self {
            version: version.into(),
            feature_names,
            scorer,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Project a feature mapping onto this artifact's feature order.
    pub fn feature_vector(&self, features: &FeatureMap) -> Vec<f64> {
        feature_vector(&self.feature_names, features)
    }

    /// Score a feature mapping; result is clamped to [0, 1].
    pub fn score(&self, features: &FeatureMap) -> f64 {
        clamp_probability(self.scorer.predict_proba(&self.feature_vector(features)))
    }
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("version", &self.version)
            .field("feature_names", &self.feature_names)
            .field("scorer", &self.scorer.name())
            .finish()
    }
}

/// Build the dense vector for `names` from `features`.
///
/// Missing or non-finite values become 0.0; keys not in `names` are ignored.
pub fn feature_vector(names: &[String], features: &FeatureMap) -> Vec<f64> {
    names
        .iter()
        .map(|name| {
            features
                .get(name)
                .copied()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        })
        .collect()
}

/// Clamp a raw scorer output into [0, 1]. NaN maps to the neutral value.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        NEUTRAL_PROBABILITY
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Deserialize a feature mapping leniently.
///
/// Null, string, boolean and nested values are treated as absent, and so is a
/// `null` mapping. Absent features later project to 0.0.
pub fn deserialize_features<'de, D>(deserializer: D) -> Result<FeatureMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default, deserialize_with = "deserialize_features")]
    pub features: FeatureMap,
    /// Overrides the predictor's default threshold for this request.
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub probability: f64,
    pub threshold: f64,
    /// 1 when `probability >= threshold`.
    pub decision: u8,
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub loaded: bool,
    pub version: Option<String>,
    pub features: Vec<String>,
}

/// Serving-side owner of the (optional) loaded artifact.
#[derive(Debug)]
pub struct Predictor {
    artifact: Option<ModelArtifact>,
    default_threshold: f64,
}

impl Predictor {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            artifact: Some(artifact),
            default_threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Predictor with no artifact: every request scores 0.5.
    pub fn neutral() -> Self {
        Self {
            artifact: None,
            default_threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Load an artifact file, degrading to [`Predictor::neutral`] when the
    /// file does not exist. Any other load failure is returned.
    pub fn load_or_neutral(path: &Path) -> Result<Self, ArtifactError> {
        match ArtifactFile::load(path) {
            Ok(file) => {
                let artifact = file.into_artifact();
                info!(
                    path = %path.display(),
                    version = artifact.version(),
                    features = artifact.feature_names().len(),
                    "model artifact loaded"
                );
                Ok(Self::new(artifact))
            }
            Err(ArtifactError::NotFound(p)) => {
                warn!(path = %p.display(), "no model artifact; serving neutral probability");
                Ok(Self::neutral())
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    /// Clamped probability of class 1 for a feature mapping.
    pub fn predict_proba(&self, features: &FeatureMap) -> f64 {
        match &self.artifact {
            Some(artifact) => artifact.score(features),
            None => NEUTRAL_PROBABILITY,
        }
    }

    pub fn predict(&self, request: &PredictRequest) -> PredictResponse {
        let probability = self.predict_proba(&request.features);
        let threshold = request
            .threshold
            .filter(|t| t.is_finite())
            .map_or(self.default_threshold, |t| t.clamp(0.0, 1.0));
        PredictResponse {
            probability,
            threshold,
            decision: u8::from(probability >= threshold),
        }
    }

    pub fn health(&self) -> Health {
        match &self.artifact {
            Some(a) => Health {
                loaded: true,
                version: Some(a.version().to_string()),
                features: a.feature_names().to_vec(),
            },
            None => Health {
                loaded: false,
                version: None,
                features: Vec::new(),
            },
        }
    }
}
