//! Model fitting: z-score standardization and L2-regularized logistic
//! regression by full-batch gradient descent.
//!
//! Fitting is deterministic: weights start at zero and the epoch count is
//! fixed, so the same rows always produce the same model.

use serde::{Deserialize, Serialize};

use barrierlab_core::inference::{CalibratedLogistic, LogisticModel, Standardizer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the weights (not the bias).
    pub l2: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 400,
            l2: 1e-3,
        }
    }
}

/// Column means and floored standard deviations.
pub fn fit_standardizer(x: &[Vec<f64>]) -> Standardizer {
    let Some(first) = x.first() else {
        return Standardizer::identity(0);
    };
    let d = first.len();
    let n = x.len() as f64;

    let mut mean = vec![0.0; d];
    for row in x {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut var = vec![0.0; d];
    for row in x {
        for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
            *s += (v - m).powi(2);
        }
    }
    let scale = var
        .into_iter()
        .map(|s| Standardizer::scale_from_variance(s / n))
        .collect();

    Standardizer { mean, scale }
}

/// Fit logistic weights on already-standardized rows.
pub fn fit_logistic(z: &[Vec<f64>], y: &[f64], config: &FitConfig) -> LogisticModel {
    let d = z.first().map_or(0, Vec::len);
    let mut model = LogisticModel::zeros(d);
    if z.is_empty() {
        return model;
    }
    let n = z.len() as f64;

    let mut grad = vec![0.0; d];
    for _ in 0..config.epochs {
        grad.iter_mut().for_each(|g| *g = 0.0);
        let mut grad_b = 0.0;

        for (row, &target) in z.iter().zip(y) {
            let err = model.probability(row) - target;
            for (g, v) in grad.iter_mut().zip(row) {
                *g += err * v;
            }
            grad_b += err;
        }

        for (w, g) in model.weights.iter_mut().zip(&grad) {
            *w -= config.learning_rate * (g / n + config.l2 * *w);
        }
        model.bias -= config.learning_rate * grad_b / n;
    }

    model
}

/// Standardize, then fit. The result carries no calibration curve.
pub fn fit_model(x: &[Vec<f64>], y: &[f64], config: &FitConfig) -> CalibratedLogistic {
    let standardizer = fit_standardizer(x);
    let z: Vec<Vec<f64>> = x.iter().map(|row| standardizer.transform(row)).collect();
    let logistic = fit_logistic(&z, y, config);
    CalibratedLogistic {
        standardizer,
        logistic,
        calibration: None,
    }
}

/// Mean binary cross-entropy of probabilities against 0/1 targets.
pub fn log_loss(p: &[f64], y: &[f64]) -> f64 {
    const CLIP: f64 = 1e-15;
    let n = p.len().max(1) as f64;
    p.iter()
        .zip(y)
        .map(|(&p, &y)| {
            let p = p.clamp(CLIP, 1.0 - CLIP);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / n
}

/// Probability without calibration for a fitted model.
pub fn raw_scores(model: &CalibratedLogistic, x: &[Vec<f64>]) -> Vec<f64> {
    x.iter().map(|row| model.raw_probability(row)).collect()
}
