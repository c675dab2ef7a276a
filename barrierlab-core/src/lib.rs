//! BarrierLab Core: bars, smoothing primitives, features, labels, inference.
//!
//! This crate contains everything shared by training and serving:
//! - Bar ingestion from CSV with explicit timezone handling
//! - EMA, Wilder ATR, and session-anchored VWAP
//! - The seven-feature ATR-normalized assembler
//! - The triple-barrier label engine
//! - The inference contract (feature ordering, clamping, neutral fallback)
//!
//! Training-side orchestration (fitting, validation, persistence) lives in
//! `barrierlab-runner`.

pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod inference;
pub mod labels;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across threads are Send + Sync.
    ///
    /// The runner fits validation folds on a rayon pool and a loaded
    /// predictor is shared behind `Arc`.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::SessionClock>();
        require_sync::<domain::SessionClock>();

        require_send::<features::FeatureConfig>();
        require_sync::<features::FeatureConfig>();
        require_send::<features::FeatureFrame>();
        require_sync::<features::FeatureFrame>();

        require_send::<labels::BarrierConfig>();
        require_sync::<labels::BarrierConfig>();
        require_send::<labels::BarrierLabel>();
        require_sync::<labels::BarrierLabel>();

        require_send::<inference::ModelArtifact>();
        require_sync::<inference::ModelArtifact>();
        require_send::<inference::Predictor>();
        require_sync::<inference::Predictor>();
        require_send::<inference::CalibratedLogistic>();
        require_sync::<inference::CalibratedLogistic>();
    }

    /// Indicators are usable as trait objects.
    #[test]
    fn indicators_are_object_safe() {
        let list: Vec<Box<dyn indicators::Indicator>> = vec![
            Box::new(indicators::Ema::new(9)),
            Box::new(indicators::Atr::new(14)),
            Box::new(indicators::SessionVwap::new(domain::SessionClock::default())),
        ];
        let bars = indicators::make_bars(&[100.0, 101.0, 102.0]);
        for ind in &list {
            assert_eq!(ind.compute(&bars).len(), bars.len(), "{}", ind.name());
        }
    }
}
