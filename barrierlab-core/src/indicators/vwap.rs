//! Session-anchored VWAP.
//!
//! Bars are grouped by local calendar date (per [`SessionClock`]); each group
//! gets an independent running sum of typical_price * weight over the running
//! sum of weight. The first bar of every local date starts a fresh sum.
//! Weight is the bar volume, or 1.0 when volume is missing.
//! Lookback: 0.

use indexmap::IndexMap;

use super::indicator::Indicator;
use crate::domain::{Bar, SessionClock};

/// Floor applied to the cumulative weight before dividing.
pub const VWAP_WEIGHT_FLOOR: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SessionVwap {
    clock: SessionClock,
    name: String,
}

impl SessionVwap {
    pub fn new(clock: SessionClock) -> Self {
        Self {
            clock,
            name: format!("vwap_{}", clock.tz().name()),
        }
    }
}

impl Indicator for SessionVwap {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        session_vwap(bars, &self.clock)
    }
}

/// Partition bar indices by local date, preserving first-seen order of dates
/// and original order within each date.
pub fn partition_by_session(bars: &[Bar], clock: &SessionClock) -> Vec<Vec<usize>> {
    let mut groups: IndexMap<chrono::NaiveDate, Vec<usize>> = IndexMap::new();
    for (i, bar) in bars.iter().enumerate() {
        groups
            .entry(clock.local_date(bar.timestamp))
            .or_default()
            .push(i);
    }
    groups.into_values().collect()
}

/// Compute session VWAP for every bar.
pub fn session_vwap(bars: &[Bar], clock: &SessionClock) -> Vec<f64> {
    let mut result = vec![f64::NAN; bars.len()];

    for session in partition_by_session(bars, clock) {
        let mut cum_pv = 0.0;
        let mut cum_w = 0.0;
        for i in session {
            let bar = &bars[i];
            let w = bar.weight();
            cum_pv += bar.typical_price() * w;
            cum_w += w;
            result[i] = cum_pv / cum_w.max(VWAP_WEIGHT_FLOOR);
        }
    }

    result
}
