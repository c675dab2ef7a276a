//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//! Seed: EMA[0] = close[0] (no SMA warmup, every index is defined).
//! Lookback: 0.

use super::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Compute EMA values from a pre-extracted f64 slice.
///
/// Single forward pass carrying one accumulator, seeded with `values[0]`.
/// Output has the same length as the input.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    result.push(first);

    let mut prev = first;
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        result.push(prev);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        let result = Ema::new(1).compute(&bars);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // Closes: 10, 11, 12, 13
        // alpha = 2/(3+1) = 0.5
        // EMA[0] = 10 (seed)
        // EMA[1] = 0.5*11 + 0.5*10   = 10.5
        // EMA[2] = 0.5*12 + 0.5*10.5 = 11.25
        // EMA[3] = 0.5*13 + 0.5*11.25 = 12.125
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        let result = Ema::new(3).compute(&bars);

        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 10.5, DEFAULT_EPSILON);
        assert_approx(result[2], 11.25, DEFAULT_EPSILON);
        assert_approx(result[3], 12.125, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_of_constant_is_constant() {
        let values = vec![42.5; 50];
        for period in [1, 9, 21, 200] {
            let result = ema_of_series(&values, period);
            assert_eq!(result.len(), values.len());
            for v in result {
                assert_approx(v, 42.5, DEFAULT_EPSILON);
            }
        }
    }

    #[test]
    fn ema_has_no_warmup_gap() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let result = Ema::new(21).compute(&bars);
        assert!(result.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ema_of_empty_is_empty() {
        assert!(ema_of_series(&[], 9).is_empty());
    }

    #[test]
    fn ema_lookback_and_name() {
        let ema = Ema::new(21);
        assert_eq!(ema.lookback(), 0);
        assert_eq!(ema.name(), "ema_21");
    }

    #[test]
    fn ema_of_series_matches_indicator() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let indicator_result = Ema::new(3).compute(&bars);
        let series_result = ema_of_series(&closes, 3);
        for i in 0..6 {
            assert_approx(indicator_result[i], series_result[i], DEFAULT_EPSILON);
        }
    }
}
