//! Training configuration, loaded from TOML.
//!
//! Every section is optional; omitted keys take their defaults.
//!
//! ```toml
//! timeframe = "M5"
//!
//! [features]
//! atr_period = 14
//! session_tz = "America/Sao_Paulo"
//!
//! [labels]
//! horizon = 8
//! k_sl = 1.0
//! k_tp = 2.0
//! drop_truncated = false
//!
//! [ingest]
//! source_tz = "UTC"
//! ambiguous = "drop"
//!
//! [fit]
//! learning_rate = 0.1
//! epochs = 400
//! l2 = 0.001
//!
//! [validation]
//! n_splits = 5
//! calibrate = true
//! ```

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use barrierlab_core::data::{AmbiguousPolicy, IngestOptions};
use barrierlab_core::domain::{SessionClock, DEFAULT_SESSION_TZ};
use barrierlab_core::features::{FeatureConfig, DEFAULT_ATR_PERIOD, FEATURE_EPSILON};
use barrierlab_core::labels::BarrierConfig;

use crate::fit::FitConfig;
use crate::validation::ValidationConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{field} must be {rule} (got {value})")]
    Invalid {
        field: &'static str,
        rule: &'static str,
        value: String,
    },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSection {
    pub atr_period: usize,
    pub epsilon: f64,
    /// IANA name of the session timezone (VWAP reset and `hour`).
    pub session_tz: String,
}

impl Default for FeatureSection {
    fn default() -> Self {
        Self {
            atr_period: DEFAULT_ATR_PERIOD,
            epsilon: FEATURE_EPSILON,
            session_tz: DEFAULT_SESSION_TZ.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSection {
    pub horizon: usize,
    pub k_sl: f64,
    pub k_tp: f64,
    /// Exclude rows whose label window ran past the end of data.
    pub drop_truncated: bool,
}

impl Default for LabelSection {
    fn default() -> Self {
        let b = BarrierConfig::default();
        Self {
            horizon: b.horizon,
            k_sl: b.k_sl,
            k_tp: b.k_tp,
            drop_truncated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// IANA name used to read naive timestamps.
    pub source_tz: String,
    pub ambiguous: AmbiguousPolicy,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            source_tz: "UTC".to_string(),
            ambiguous: AmbiguousPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Free-form bar interval tag recorded in the metadata sidecar.
    pub timeframe: String,
    pub features: FeatureSection,
    pub labels: LabelSection,
    pub ingest: IngestSection,
    pub fit: FitConfig,
    pub validation: ValidationConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            timeframe: "M5".to_string(),
            features: FeatureSection::default(),
            labels: LabelSection::default(),
            ingest: IngestSection::default(),
            fit: FitConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

fn parse_tz(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

fn check(ok: bool, field: &'static str, rule: &'static str, value: impl ToString) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            rule,
            value: value.to_string(),
        })
    }
}

impl TrainConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.features;
        check(f.atr_period >= 1, "features.atr_period", ">= 1", f.atr_period)?;
        check(f.epsilon > 0.0 && f.epsilon.is_finite(), "features.epsilon", "a positive number", f.epsilon)?;
        parse_tz(&f.session_tz)?;

        let l = &self.labels;
        check(l.horizon >= 1, "labels.horizon", ">= 1", l.horizon)?;
        check(l.k_sl > 0.0 && l.k_sl.is_finite(), "labels.k_sl", "a positive number", l.k_sl)?;
        check(l.k_tp > 0.0 && l.k_tp.is_finite(), "labels.k_tp", "a positive number", l.k_tp)?;

        parse_tz(&self.ingest.source_tz)?;

        let fit = &self.fit;
        check(
            fit.learning_rate > 0.0 && fit.learning_rate.is_finite(),
            "fit.learning_rate",
            "a positive number",
            fit.learning_rate,
        )?;
        check(fit.epochs >= 1, "fit.epochs", ">= 1", fit.epochs)?;
        check(fit.l2 >= 0.0 && fit.l2.is_finite(), "fit.l2", "non-negative", fit.l2)?;

        check(self.validation.n_splits >= 2, "validation.n_splits", ">= 2", self.validation.n_splits)
    }

    pub fn feature_config(&self) -> Result<FeatureConfig, ConfigError> {
        Ok(FeatureConfig {
            atr_period: self.features.atr_period,
            epsilon: self.features.epsilon,
            session: SessionClock::new(parse_tz(&self.features.session_tz)?),
        })
    }

    pub fn barrier_config(&self) -> BarrierConfig {
        BarrierConfig {
            horizon: self.labels.horizon,
            k_sl: self.labels.k_sl,
            k_tp: self.labels.k_tp,
        }
    }

    pub fn ingest_options(&self) -> Result<IngestOptions, ConfigError> {
        Ok(IngestOptions {
            source_tz: parse_tz(&self.ingest.source_tz)?,
            ambiguous: self.ingest.ambiguous,
        })
    }
}
