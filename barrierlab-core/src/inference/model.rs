//! Calibrated logistic scorer: the concrete model behind persisted artifacts.
//!
//! Scoring pipeline: z-score standardization → logistic regression →
//! optional isotonic calibration curve. Fitting lives in the runner; this
//! module only holds the fitted parameters and applies them.

use serde::{Deserialize, Serialize};

use super::Scorer;

/// Variance floor used when deriving a standardization scale.
pub const VARIANCE_FLOOR: f64 = 1e-8;

/// Per-feature z-score transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Standardizer {
    /// Identity transform over `n` features.
    pub fn identity(n: usize) -> Self {
        Self {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    /// Scale derived from a variance, floored to stay invertible.
    pub fn scale_from_variance(variance: f64) -> f64 {
        variance.max(VARIANCE_FLOOR).sqrt()
    }

    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Linear decision function squashed through a sigmoid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticModel {
    pub fn zeros(n: usize) -> Self {
        Self {
            weights: vec![0.0; n],
            bias: 0.0,
        }
    }

    pub fn decision(&self, z: &[f64]) -> f64 {
        self.bias + self.weights.iter().zip(z).map(|(w, v)| w * v).sum::<f64>()
    }

    pub fn probability(&self, z: &[f64]) -> f64 {
        sigmoid(self.decision(z))
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(t: f64) -> f64 {
    if t >= 0.0 {
        1.0 / (1.0 + (-t).exp())
    } else {
        let e = t.exp();
        e / (1.0 + e)
    }
}

/// Monotone step-to-linear map from raw score to calibrated probability.
///
/// `xs` is strictly increasing, `ys` non-decreasing and within [0, 1].
/// Inputs outside the fitted range take the nearest end value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotonicCurve {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl IsotonicCurve {
    /// Map a raw score through the curve.
    ///
    /// Only the common prefix of `xs` and `ys` is used, so a malformed curve
    /// degrades instead of panicking; [`IsotonicCurve::is_valid`] is the real gate.
    pub fn apply(&self, x: f64) -> f64 {
        let n = self.xs.len().min(self.ys.len());
        let (xs, ys) = (&self.xs[..n], &self.ys[..n]);
        let (Some(&x0), Some(&xn)) = (xs.first(), xs.last()) else {
            return x;
        };
        if x <= x0 {
            return ys[0];
        }
        if x >= xn {
            return ys[n - 1];
        }

        // x0 < x < xn so n >= 2; the clamp keeps unsorted knots in bounds.
        let hi = xs.partition_point(|&k| k <= x).clamp(1, n - 1);
        let lo = hi - 1;
        let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
        ys[lo] + t * (ys[hi] - ys[lo])
    }

    pub fn is_valid(&self) -> bool {
        self.xs.len() == self.ys.len()
            && !self.xs.is_empty()
            && self.xs.windows(2).all(|w| w[0] < w[1])
            && self.ys.windows(2).all(|w| w[0] <= w[1])
            && self.ys.iter().all(|y| (0.0..=1.0).contains(y))
    }
}

/// Standardize, score, calibrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedLogistic {
    pub standardizer: Standardizer,
    pub logistic: LogisticModel,
    #[serde(default)]
    pub calibration: Option<IsotonicCurve>,
}

impl CalibratedLogistic {
    /// Number of input features the model expects.
    pub fn n_features(&self) -> usize {
        self.logistic.weights.len()
    }

    /// Uncalibrated logistic probability.
    pub fn raw_probability(&self, x: &[f64]) -> f64 {
        self.logistic.probability(&self.standardizer.transform(x))
    }

    pub fn is_consistent(&self) -> bool {
        let n = self.n_features();
        let params_finite = self
            .standardizer
            .mean
            .iter()
            .chain(&self.standardizer.scale)
            .chain(&self.logistic.weights)
            .chain(std::iter::once(&self.logistic.bias))
            .all(|v| v.is_finite());
        self.standardizer.mean.len() == n
            && self.standardizer.scale.len() == n
            && self.standardizer.scale.iter().all(|s| *s > 0.0)
            && params_finite
            && self.calibration.as_ref().map_or(true, IsotonicCurve::is_valid)
    }
}

impl Scorer for CalibratedLogistic {
    fn predict_proba(&self, x: &[f64]) -> f64 {
        let raw = self.raw_probability(x);
        match &self.calibration {
            Some(curve) => curve.apply(raw),
            None => raw,
        }
    }

    fn name(&self) -> &str {
        if self.calibration.is_some() {
            "logistic+isotonic"
        } else {
            "logistic"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_symmetric_and_bounded() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!((sigmoid(3.0) + sigmoid(-3.0) - 1.0).abs() < 1e-12);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
    }

    #[test]
    fn standardizer_transforms() {
        let s = Standardizer {
            mean: vec![1.0, 10.0],
            scale: vec![2.0, 5.0],
        };
        assert_eq!(s.transform(&[3.0, 0.0]), vec![1.0, -2.0]);
    }

    #[test]
    fn variance_floor_keeps_scale_positive() {
        assert!(Standardizer::scale_from_variance(0.0) > 0.0);
        assert_eq!(Standardizer::scale_from_variance(4.0), 2.0);
    }

    #[test]
    fn isotonic_interpolates_and_clips() {
        let curve = IsotonicCurve {
            xs: vec![0.2, 0.6],
            ys: vec![0.1, 0.9],
        };
        assert!(curve.is_valid());
        assert_eq!(curve.apply(0.0), 0.1);
        assert_eq!(curve.apply(1.0), 0.9);
        assert!((curve.apply(0.4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn isotonic_single_knot_is_constant() {
        let curve = IsotonicCurve {
            xs: vec![0.3],
            ys: vec![0.7],
        };
        assert_eq!(curve.apply(0.1), 0.7);
        assert_eq!(curve.apply(0.9), 0.7);
    }

    #[test]
    fn zero_model_scores_one_half() {
        let model = CalibratedLogistic {
            standardizer: Standardizer::identity(3),
            logistic: LogisticModel::zeros(3),
            calibration: None,
        };
        assert!(model.is_consistent());
        assert!((model.predict_proba(&[1.0, 2.0, 3.0]) - 0.5).abs() < 1e-12);
        assert_eq!(model.name(), "logistic");
    }

    #[test]
    fn inconsistent_lengths_detected() {
        let model = CalibratedLogistic {
            standardizer: Standardizer::identity(2),
            logistic: LogisticModel::zeros(3),
            calibration: None,
        };
        assert!(!model.is_consistent());
    }

    #[test]
    fn mismatched_curve_does_not_panic() {
        let short_ys = IsotonicCurve {
            xs: vec![0.1, 0.5, 0.9],
            ys: vec![0.2],
        };
        assert!(!short_ys.is_valid());
        assert_eq!(short_ys.apply(0.7), 0.2);

        let empty_ys = IsotonicCurve {
            xs: vec![0.1, 0.9],
            ys: vec![],
        };
        assert_eq!(empty_ys.apply(0.4), 0.4);

        let unsorted = IsotonicCurve {
            xs: vec![0.0, 0.8, 0.3, 1.0],
            ys: vec![0.0, 0.5, 0.6, 1.0],
        };
        assert!(unsorted.apply(0.5).is_finite());

        let model = CalibratedLogistic {
            standardizer: Standardizer::identity(1),
            logistic: LogisticModel::zeros(1),
            calibration: Some(short_ys),
        };
        assert!(!model.is_consistent());
        let p = crate::inference::clamp_probability(model.predict_proba(&[1.0]));
        assert!((0.0..=1.0).contains(&p));
    }
}
