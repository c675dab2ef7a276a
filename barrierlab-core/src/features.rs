//! Feature assembler: ATR-normalized features over a bar sequence.
//!
//! Every feature is divided by `max(epsilon, ATR)`:
//!
//! | key           | numerator                         |
//! |---------------|-----------------------------------|
//! | `dist_ema21`  | close - EMA21                     |
//! | `dist_vwap`   | close - session VWAP              |
//! | `slope_e9`    | EMA9[t] - EMA9[t-1] (0 at t = 0)  |
//! | `slope_e21`   | EMA21[t] - EMA21[t-1] (0 at t = 0)|
//! | `range_ratio` | high - low                        |
//! | `ret1`        | close - prev close (0 at t = 0)   |
//!
//! plus `hour`, the local hour of day as a real number (not normalized).
//!
//! The auxiliary series are forward/backward filled before any feature is
//! derived. A non-finite value that still reaches the output is a bug in the
//! input or the fill, and is reported as [`FeatureError::UndefinedValue`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Bar, SessionClock};
use crate::indicators::{ema_of_series, fill_gaps, first_undefined, session_vwap, Atr, Indicator};

/// Feature keys in the order they are emitted and scored.
pub const FEATURE_NAMES: [&str; 7] = [
    "dist_ema21",
    "dist_vwap",
    "slope_e9",
    "slope_e21",
    "range_ratio",
    "ret1",
    "hour",
];

pub const FAST_EMA_PERIOD: usize = 9;
pub const SLOW_EMA_PERIOD: usize = 21;
pub const DEFAULT_ATR_PERIOD: usize = 14;
/// Floor on the ATR denominator.
pub const FEATURE_EPSILON: f64 = 1e-6;

/// Named feature mapping, iterated in insertion order.
pub type FeatureMap = IndexMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub atr_period: usize,
    pub epsilon: f64,
    pub session: SessionClock,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            atr_period: DEFAULT_ATR_PERIOD,
            epsilon: FEATURE_EPSILON,
            session: SessionClock::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("ATR period must be >= 1")]
    InvalidPeriod,

    #[error("need at least {needed} bars, got {got}")]
    InsufficientBars { needed: usize, got: usize },

    #[error("undefined value in '{series}' at bar {index}")]
    UndefinedValue { series: &'static str, index: usize },
}

/// One row of features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub dist_ema21: f64,
    pub dist_vwap: f64,
    pub slope_e9: f64,
    pub slope_e21: f64,
    pub range_ratio: f64,
    pub ret1: f64,
    pub hour: f64,
}

impl FeatureRow {
    /// Dense values in [`FEATURE_NAMES`] order.
    pub fn values(&self) -> [f64; 7] {
        [
            self.dist_ema21,
            self.dist_vwap,
            self.slope_e9,
            self.slope_e21,
            self.range_ratio,
            self.ret1,
            self.hour,
        ]
    }

    /// Named mapping in [`FEATURE_NAMES`] order.
    pub fn to_map(&self) -> FeatureMap {
        FEATURE_NAMES
            .iter()
            .zip(self.values())
            .map(|(name, v)| (name.to_string(), v))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values()[i])
    }
}

/// Auxiliary series aligned to the bar sequence, after gap filling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxSeries {
    pub ema9: Vec<f64>,
    pub ema21: Vec<f64>,
    pub atr: Vec<f64>,
    pub vwap: Vec<f64>,
}

/// Assembled features plus the auxiliary series they were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub rows: Vec<FeatureRow>,
    pub aux: AuxSeries,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Features of the most recent bar, the row scored at serving time.
    pub fn latest(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }
}

/// Compute the auxiliary series (EMA9, EMA21, ATR, VWAP), gap-filled.
pub fn compute_aux(bars: &[Bar], config: &FeatureConfig) -> Result<AuxSeries, FeatureError> {
    if config.atr_period == 0 {
        return Err(FeatureError::InvalidPeriod);
    }
    let needed = config.atr_period.max(1);
    if bars.len() < needed {
        return Err(FeatureError::InsufficientBars {
            needed,
            got: bars.len(),
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mut aux = AuxSeries {
        ema9: ema_of_series(&closes, FAST_EMA_PERIOD),
        ema21: ema_of_series(&closes, SLOW_EMA_PERIOD),
        atr: Atr::new(config.atr_period).compute(bars),
        vwap: session_vwap(bars, &config.session),
    };

    for (series, values) in [
        ("ema9", &mut aux.ema9),
        ("ema21", &mut aux.ema21),
        ("atr", &mut aux.atr),
        ("vwap", &mut aux.vwap),
    ] {
        let filled = fill_gaps(values);
        if filled > 0 {
            debug!(series, filled, "filled warmup gap");
        }
        if let Some(index) = first_undefined(values) {
            return Err(FeatureError::UndefinedValue { series, index });
        }
    }

    Ok(aux)
}

/// Assemble the feature rows for every bar.
pub fn assemble_features(
    bars: &[Bar],
    config: &FeatureConfig,
) -> Result<FeatureFrame, FeatureError> {
    let aux = compute_aux(bars, config)?;
    let eps = config.epsilon;

    let mut rows = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let denom = aux.atr[i].max(eps);
        let prev = i.saturating_sub(1);

        let row = FeatureRow {
            dist_ema21: (bar.close - aux.ema21[i]) / denom,
            dist_vwap: (bar.close - aux.vwap[i]) / denom,
            slope_e9: (aux.ema9[i] - aux.ema9[prev]) / denom,
            slope_e21: (aux.ema21[i] - aux.ema21[prev]) / denom,
            range_ratio: (bar.high - bar.low) / denom,
            ret1: (bar.close - bars[prev].close) / denom,
            hour: f64::from(config.session.local_hour(bar.timestamp)),
        };

        if let Some(pos) = row.values().iter().position(|v| !v.is_finite()) {
            return Err(FeatureError::UndefinedValue {
                series: FEATURE_NAMES[pos],
                index: i,
            });
        }
        rows.push(row);
    }

    Ok(FeatureFrame { rows, aux })
}
