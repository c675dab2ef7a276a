//! Time-series cross-validation: expanding-window folds and out-of-fold AUC.
//!
//! Rows are in time order. With `n_splits = k`, the test size is
//! `n / (k + 1)` and fold j trains on every row before its test block:
//!
//! - Fold 0: train = [0 .. n - k*t),     test = next t rows
//! - Fold 1: train = [0 .. n - (k-1)*t), test = next t rows
//! - etc.
//!
//! Folds are fitted in parallel. Every test row gets exactly one
//! out-of-fold score; the leading rows of fold 0's training block get none.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fit::{fit_model, log_loss, raw_scores, FitConfig};
use crate::trainer::TrainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub n_splits: usize,
    /// Fit an isotonic curve on the out-of-fold scores.
    pub calibrate: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            calibrate: true,
        }
    }
}

/// Row index ranges of one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    /// Training rows are `0..train_end`.
    pub train_end: usize,
    /// Test start (inclusive), equal to `train_end`.
    pub test_start: usize,
    /// Test end (exclusive).
    pub test_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_index: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the test block holds a single class.
    pub auc: Option<f64>,
    pub log_loss: f64,
}

/// Out-of-fold predictions plus per-fold diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: Vec<FoldResult>,
    /// Raw (uncalibrated) score for every row covered by a test block.
    pub oof_scores: Vec<f64>,
    /// Labels aligned with `oof_scores`.
    pub oof_labels: Vec<f64>,
}

impl CrossValidation {
    /// AUC over all out-of-fold predictions pooled together.
    pub fn pooled_auc(&self) -> Option<f64> {
        roc_auc(&self.oof_scores, &self.oof_labels)
    }

    /// Mean of the defined per-fold AUCs.
    pub fn mean_fold_auc(&self) -> Option<f64> {
        let defined: Vec<f64> = self.folds.iter().filter_map(|f| f.auc).collect();
        if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        }
    }
}

/// Build expanding-window folds over `n_rows` rows.
pub fn time_series_splits(n_rows: usize, n_splits: usize) -> Result<Vec<FoldSpec>, TrainError> {
    let needed = n_splits + 1;
    if n_splits < 2 || n_rows < needed {
        return Err(TrainError::InsufficientRows {
            rows: n_rows,
            needed,
        });
    }

    let test_size = n_rows / needed;
    let first_test = n_rows - n_splits * test_size;

    Ok((0..n_splits)
        .map(|fold_index| {
            let test_start = first_test + fold_index * test_size;
            FoldSpec {
                fold_index,
                train_end: test_start,
                test_start,
                test_end: test_start + test_size,
            }
        })
        .collect())
}

/// Fit every fold and collect out-of-fold raw scores.
pub fn cross_validate(
    x: &[Vec<f64>],
    y: &[f64],
    folds: &[FoldSpec],
    fit: &FitConfig,
) -> CrossValidation {
    let per_fold: Vec<(FoldResult, Vec<f64>)> = folds
        .par_iter()
        .map(|fold| {
            let model = fit_model(&x[..fold.train_end], &y[..fold.train_end], fit);
            let test_x = &x[fold.test_start..fold.test_end];
            let test_y = &y[fold.test_start..fold.test_end];
            let scores = raw_scores(&model, test_x);
            let result = FoldResult {
                fold_index: fold.fold_index,
                train_rows: fold.train_end,
                test_rows: test_x.len(),
                auc: roc_auc(&scores, test_y),
                log_loss: log_loss(&scores, test_y),
            };
            debug!(fold = fold.fold_index, auc = ?result.auc, "fold evaluated");
            (result, scores)
        })
        .collect();

    let mut cv = CrossValidation {
        folds: Vec::with_capacity(folds.len()),
        oof_scores: Vec::new(),
        oof_labels: Vec::new(),
    };
    // par_iter().collect() keeps fold order.
    for ((result, scores), fold) in per_fold.into_iter().zip(folds) {
        cv.oof_labels.extend_from_slice(&y[fold.test_start..fold.test_end]);
        cv.oof_scores.extend(scores);
        cv.folds.push(result);
    }
    cv
}

/// Rank-based ROC AUC (Mann–Whitney U); tied scores share their mean rank.
///
/// `None` when either class is absent.
pub fn roc_auc(scores: &[f64], labels: &[f64]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l >= 0.5).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; positions i..=j share the average.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] >= 0.5 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = n_pos as f64;
    let q = n_neg as f64;
    Some((rank_sum_pos - p * (p + 1.0) / 2.0) / (p * q))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_match_expanding_window() {
        // 12 rows, 3 splits: test size 3, first test block starts at 3.
        let folds = time_series_splits(12, 3).unwrap();
        assert_eq!(folds.len(), 3);
        assert_eq!((folds[0].train_end, folds[0].test_end), (3, 6));
        assert_eq!((folds[1].train_end, folds[1].test_end), (6, 9));
        assert_eq!((folds[2].train_end, folds[2].test_end), (9, 12));
    }

    #[test]
    fn remainder_goes_to_first_training_block() {
        let folds = time_series_splits(14, 3).unwrap();
        assert_eq!(folds[0].train_end, 5);
        assert_eq!(folds.last().unwrap().test_end, 14);
    }

    #[test]
    fn test_blocks_are_contiguous_and_after_training() {
        let folds = time_series_splits(101, 5).unwrap();
        for w in folds.windows(2) {
            assert_eq!(w[0].test_end, w[1].test_start);
        }
        for f in &folds {
            assert_eq!(f.train_end, f.test_start);
            assert!(f.test_end > f.test_start);
        }
    }

    #[test]
    fn too_few_rows_is_an_error() {
        assert!(matches!(
            time_series_splits(5, 5),
            Err(TrainError::InsufficientRows { rows: 5, needed: 6 })
        ));
    }

    #[test]
    fn auc_perfect_random_and_inverted() {
        let labels = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &labels), Some(1.0));
        assert_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &labels), Some(0.0));
        assert_eq!(roc_auc(&[0.5, 0.5, 0.5, 0.5], &labels), Some(0.5));
    }

    #[test]
    fn auc_handles_partial_ties() {
        // One positive tied with one negative: counts as half a win.
        let auc = roc_auc(&[0.1, 0.5, 0.5, 0.9], &[0.0, 0.0, 1.0, 1.0]).unwrap();
        assert!((auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn auc_single_class_is_none() {
        assert_eq!(roc_auc(&[0.1, 0.9], &[1.0, 1.0]), None);
        assert_eq!(roc_auc(&[], &[]), None);
    }

    #[test]
    fn cross_validation_covers_every_test_row() {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![(i % 7) as f64, 1.0]).collect();
        let y: Vec<f64> = (0..60).map(|i| if i % 7 > 3 { 1.0 } else { 0.0 }).collect();
        let folds = time_series_splits(x.len(), 5).unwrap();
        let cv = cross_validate(&x, &y, &folds, &FitConfig::default());

        assert_eq!(cv.folds.len(), 5);
        assert_eq!(cv.oof_scores.len(), 50);
        assert_eq!(cv.oof_labels, y[10..].to_vec());
        assert!(cv.oof_scores.iter().all(|p| (0.0..=1.0).contains(p)));
        // Feature 0 determines the label, so the pooled AUC is high.
        assert!(cv.pooled_auc().unwrap() > 0.9);
    }
}
