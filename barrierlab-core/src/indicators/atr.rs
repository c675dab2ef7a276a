//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), with
//! prev_close[0] = close[0] so the first bar has a defined TR.
//! ATR uses Wilder smoothing: seed at index period-1 is the plain mean of
//! TR[0..period], then ATR[t] = (ATR[t-1] * (period-1) + TR[t]) / period.
//! Lookback: period - 1 (indices 0..period-1 are NaN).

use super::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Compute the True Range series from bars.
/// TR[0] = max(high[0]-low[0], |high[0]-close[0]|, |low[0]-close[0]|).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let Some(first) = bars.first() else {
        return Vec::new();
    };

    let mut prev_close = first.close;
    bars.iter()
        .map(|bar| {
            let (h, l) = (bar.high, bar.low);
            let tr = (h - l).max((h - prev_close).abs()).max((l - prev_close).abs());
            prev_close = bar.close;
            tr
        })
        .collect()
}

/// Apply Wilder smoothing to a true-range series.
///
/// Entries before `period - 1` stay NaN. If the series is shorter than
/// `period`, every entry is NaN.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    let seed = values[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = seed;

    let p = period as f64;
    let mut prev = seed;
    for i in period..n {
        let smoothed = (prev * (p - 1.0) + values[i]) / p;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period)
    }
}
