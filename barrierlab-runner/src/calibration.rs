//! Isotonic calibration by pool-adjacent-violators.
//!
//! Input: raw scores and 0/1 targets (the out-of-fold predictions).
//! Output: an [`IsotonicCurve`] whose knots are the block means of the
//! pooled solution. Identical scores are pooled before fitting so knot
//! positions are strictly increasing.

use barrierlab_core::inference::IsotonicCurve;

/// A run of pooled points.
#[derive(Debug, Clone, Copy)]
struct Block {
    sum_x: f64,
    sum_y: f64,
    weight: f64,
}

impl Block {
    fn x(&self) -> f64 {
        self.sum_x / self.weight
    }

    fn y(&self) -> f64 {
        self.sum_y / self.weight
    }

    fn absorb(&mut self, other: Block) {
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.weight += other.weight;
    }
}

/// Fit a non-decreasing map from score to observed frequency.
///
/// Non-finite scores are skipped. Returns `None` when nothing is left.
pub fn fit_isotonic(scores: &[f64], targets: &[f64]) -> Option<IsotonicCurve> {
    let mut points: Vec<(f64, f64)> = scores
        .iter()
        .zip(targets)
        .filter(|(s, t)| s.is_finite() && t.is_finite())
        .map(|(&s, &t)| (s, t.clamp(0.0, 1.0)))
        .collect();
    if points.is_empty() {
        return None;
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut stack: Vec<Block> = Vec::with_capacity(points.len());
    let mut i = 0;
    while i < points.len() {
        // Ties share one block.
        let mut block = Block {
            sum_x: 0.0,
            sum_y: 0.0,
            weight: 0.0,
        };
        let x = points[i].0;
        while i < points.len() && points[i].0 == x {
            block.absorb(Block {
                sum_x: x,
                sum_y: points[i].1,
                weight: 1.0,
            });
            i += 1;
        }

        while let Some(prev) = stack.last() {
            if prev.y() <= block.y() {
                break;
            }
            let mut merged = *prev;
            merged.absorb(block);
            block = merged;
            stack.pop();
        }
        stack.push(block);
    }

    Some(IsotonicCurve {
        xs: stack.iter().map(Block::x).collect(),
        ys: stack.iter().map(|b| b.y().clamp(0.0, 1.0)).collect(),
    })
}
