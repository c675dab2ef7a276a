//! Concrete indicator implementations.
//!
//! Three indicators feed the feature assembler: EMA, Wilder ATR and
//! session-anchored VWAP. All implement the [`Indicator`] trait and are
//! computed once over the full bar sequence; leading gaps are resolved by
//! [`fill_gaps`].

pub mod atr;
pub mod ema;
pub mod fill;
pub mod indicator;
pub mod vwap;

pub use atr::{true_range, wilder_smooth, Atr};
pub use ema::{ema_of_series, Ema};
pub use fill::{fill_gaps, first_undefined};
pub use indicator::Indicator;
pub use vwap::{partition_by_session, session_vwap, SessionVwap};

/// Create synthetic 5-minute bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: Some(1000.0),
            }
        })
        .collect()
}

/// Create 5-minute bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::minutes(5 * i as i64),
            open,
            high,
            low,
            close,
            volume: Some(1000.0),
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
