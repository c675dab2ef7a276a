//! Gap filling for indicator warmup.
//!
//! Forward-fill carries the last defined value over any NaN gap; backward-fill
//! then copies the first defined value into the leading gap. A series with
//! no defined value at all is left untouched. Infinities are not gaps: they
//! are reported by [`first_undefined`] instead of being papered over.

/// Forward-fill then backward-fill NaN entries in place.
///
/// Returns the number of entries that were filled.
pub fn fill_gaps(values: &mut [f64]) -> usize {
    let mut filled = 0;

    let mut last: Option<f64> = None;
    for v in values.iter_mut() {
        if !v.is_nan() {
            last = Some(*v);
        } else if let Some(prev) = last {
            *v = prev;
            filled += 1;
        }
    }

    let Some(first_defined) = values.iter().copied().find(|v| !v.is_nan()) else {
        return filled;
    };
    for v in values.iter_mut() {
        if !v.is_nan() {
            break;
        }
        *v = first_defined;
        filled += 1;
    }

    filled
}

/// Index of the first non-finite entry, if any.
pub fn first_undefined(values: &[f64]) -> Option<usize> {
    values.iter().position(|v| !v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_gap_is_backfilled() {
        let mut v = vec![f64::NAN, f64::NAN, 3.0, 4.0];
        assert_eq!(fill_gaps(&mut v), 2);
        assert_eq!(v, vec![3.0, 3.0, 3.0, 4.0]);
    }

    #[test]
    fn interior_gap_is_forward_filled() {
        let mut v = vec![1.0, f64::NAN, f64::NAN, 4.0];
        assert_eq!(fill_gaps(&mut v), 2);
        assert_eq!(v, vec![1.0, 1.0, 1.0, 4.0]);
    }

    #[test]
    fn trailing_gap_is_forward_filled() {
        let mut v = vec![1.0, 2.0, f64::NAN];
        fill_gaps(&mut v);
        assert_eq!(v, vec![1.0, 2.0, 2.0]);
    }

    #[test]
    fn all_undefined_stays_undefined() {
        let mut v = vec![f64::NAN; 3];
        assert_eq!(fill_gaps(&mut v), 0);
        assert_eq!(first_undefined(&v), Some(0));
    }

    #[test]
    fn infinity_is_not_filled() {
        let mut v = vec![1.0, f64::INFINITY, 3.0];
        assert_eq!(fill_gaps(&mut v), 0);
        assert_eq!(first_undefined(&v), Some(1));
    }

    #[test]
    fn defined_series_is_untouched() {
        let mut v = vec![1.0, 2.0, 3.0];
        assert_eq!(fill_gaps(&mut v), 0);
        assert_eq!(first_undefined(&v), None);
    }
}
