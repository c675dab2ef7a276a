//! Triple-barrier label engine.
//!
//! For bar i with ATR[i] > 0:
//! - stop-loss   = close[i] - k_sl * ATR[i]
//! - take-profit = close[i] + k_tp * ATR[i]
//! - window      = bars i..=min(n-1, i+horizon), bar i included
//!
//! Outcome over the window's max high / min low:
//! - both barriers touched → loss (the less favorable path is assumed first)
//! - take-profit only      → win
//! - stop-loss only        → loss
//! - neither               → loss (no-touch is folded into the loss class)
//!
//! Invalid ATR (non-finite or <= 0) yields no label; such rows are excluded
//! from training.
//!
//! Labels look ahead by construction. The last `horizon` bars have windows
//! cut short by the end of data and are flagged `truncated`; they are less
//! reliable than full-window labels.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierConfig {
    /// Bars to look forward past the labeled bar.
    pub horizon: usize,
    /// Stop-loss distance in ATR multiples.
    pub k_sl: f64,
    /// Take-profit distance in ATR multiples.
    pub k_tp: f64,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            horizon: 8,
            k_sl: 1.0,
            k_tp: 2.0,
        }
    }
}

/// Which barrier, if any, the window touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierOutcome {
    TakeProfit,
    StopLoss,
    BothTouched,
    NoTouch,
}

impl BarrierOutcome {
    /// Binary class: 1.0 for a clean take-profit, 0.0 otherwise.
    pub fn label(self) -> f64 {
        match self {
            BarrierOutcome::TakeProfit => 1.0,
            BarrierOutcome::StopLoss | BarrierOutcome::BothTouched | BarrierOutcome::NoTouch => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierLabel {
    pub outcome: BarrierOutcome,
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Window was cut short by the end of the data.
    pub truncated: bool,
}

impl BarrierLabel {
    pub fn value(&self) -> f64 {
        self.outcome.label()
    }

    pub fn is_win(&self) -> bool {
        self.outcome == BarrierOutcome::TakeProfit
    }
}

/// Label a single bar. `None` when `atr` is not a positive finite number.
pub fn label_at(bars: &[Bar], i: usize, atr: f64, config: &BarrierConfig) -> Option<BarrierLabel> {
    if !atr.is_finite() || atr <= 0.0 || i >= bars.len() {
        return None;
    }

    let close = bars[i].close;
    let stop_loss = close - config.k_sl * atr;
    let take_profit = close + config.k_tp * atr;

    let last = bars.len() - 1;
    let end = last.min(i.saturating_add(config.horizon));
    let window = &bars[i..=end];

    let hi = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let lo = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    let outcome = match (hi >= take_profit, lo <= stop_loss) {
        (true, true) => BarrierOutcome::BothTouched,
        (true, false) => BarrierOutcome::TakeProfit,
        (false, true) => BarrierOutcome::StopLoss,
        (false, false) => BarrierOutcome::NoTouch,
    };

    Some(BarrierLabel {
        outcome,
        take_profit,
        stop_loss,
        truncated: i.saturating_add(config.horizon) > last,
    })
}

/// Label every bar. `atr` must be aligned with `bars`.
pub fn triple_barrier_labels(
    bars: &[Bar],
    atr: &[f64],
    config: &BarrierConfig,
) -> Vec<Option<BarrierLabel>> {
    debug_assert_eq!(
        bars.len(),
        atr.len(),
        "ATR series ({}) not aligned with bars ({})",
        atr.len(),
        bars.len()
    );
    atr.iter()
        .take(bars.len())
        .enumerate()
        .map(|(i, &a)| label_at(bars, i, a, config))
        .collect()
}

/// Counts over a labeled sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub wins: usize,
    pub losses: usize,
    pub both_touched: usize,
    pub no_touch: usize,
    pub truncated: usize,
    pub invalid: usize,
}

impl LabelSummary {
    pub fn from_labels(labels: &[Option<BarrierLabel>]) -> Self {
        let mut s = Self::default();
        for label in labels {
            let Some(l) = label else {
                s.invalid += 1;
                continue;
            };
            match l.outcome {
                BarrierOutcome::TakeProfit => s.wins += 1,
                BarrierOutcome::StopLoss => s.losses += 1,
                BarrierOutcome::BothTouched => s.both_touched += 1,
                BarrierOutcome::NoTouch => s.no_touch += 1,
            }
            if l.truncated {
                s.truncated += 1;
            }
        }
        s
    }

    /// Labeled rows (excludes invalid).
    pub fn labeled(&self) -> usize {
        self.wins + self.losses + self.both_touched + self.no_touch
    }
}
