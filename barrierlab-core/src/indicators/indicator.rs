//! Indicator trait.
//!
//! Indicators are pure functions: bar history in, numeric series out.
//! They are computed once over the whole bar sequence before features are
//! assembled. No recomputation per bar.

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. Warmup positions that cannot be computed are `f64::NAN`
/// and are resolved by [`crate::indicators::fill_gaps`] before they reach a
/// feature.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_9", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading values left undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}
