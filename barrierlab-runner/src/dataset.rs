//! Training-set construction: features and triple-barrier labels, aligned.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use barrierlab_core::domain::Bar;
use barrierlab_core::features::{assemble_features, FeatureFrame, FEATURE_NAMES};
use barrierlab_core::labels::{triple_barrier_labels, BarrierLabel, LabelSummary};

use crate::config::TrainConfig;
use crate::trainer::TrainError;

/// Feature rows and their labels, excluded rows removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
    /// Bar index of each kept row.
    pub bar_index: Vec<usize>,
    /// Counts over every bar, before exclusion.
    pub summary: LabelSummary,
    /// Rows removed because their label window was truncated.
    pub dropped_truncated: usize,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.y.iter().filter(|&&v| v >= 0.5).count()
    }
}

/// Features plus labels for every bar, nothing excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFrame {
    pub frame: FeatureFrame,
    pub labels: Vec<Option<BarrierLabel>>,
}

/// Assemble features and labels over the whole bar sequence.
pub fn label_bars(bars: &[Bar], config: &TrainConfig) -> Result<LabeledFrame, TrainError> {
    let frame = assemble_features(bars, &config.feature_config()?)?;
    let labels = triple_barrier_labels(bars, &frame.aux.atr, &config.barrier_config());
    Ok(LabeledFrame { frame, labels })
}

/// Build the training matrix, dropping rows with no label.
///
/// Rows whose window ran past the end of data are kept unless
/// `labels.drop_truncated` is set.
pub fn build_training_set(bars: &[Bar], config: &TrainConfig) -> Result<TrainingSet, TrainError> {
    let LabeledFrame { frame, labels } = label_bars(bars, config)?;
    let summary = LabelSummary::from_labels(&labels);
    let drop_truncated = config.labels.drop_truncated;

    let mut set = TrainingSet {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        x: Vec::with_capacity(labels.len()),
        y: Vec::with_capacity(labels.len()),
        bar_index: Vec::with_capacity(labels.len()),
        summary,
        dropped_truncated: 0,
    };

    for (i, (row, label)) in frame.rows.iter().zip(&labels).enumerate() {
        let Some(label) = label else { continue };
        if label.truncated && drop_truncated {
            set.dropped_truncated += 1;
            continue;
        }
        set.x.push(row.values().to_vec());
        set.y.push(label.value());
        set.bar_index.push(i);
    }

    if summary.invalid > 0 {
        warn!(excluded = summary.invalid, "rows without a valid ATR excluded from training");
    }
    if summary.truncated > 0 {
        info!(
            truncated = summary.truncated,
            dropped = set.dropped_truncated,
            "label windows cut short by end of data"
        );
    }
    info!(
        rows = set.len(),
        wins = summary.wins,
        losses = summary.losses,
        ties = summary.both_touched,
        no_touch = summary.no_touch,
        "training set built"
    );

    Ok(set)
}
