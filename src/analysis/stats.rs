//! Small numeric helpers. Sums that are reported to the user are done in `Decimal` with
//! `accumulate`; the `f64` helpers are only used where a statistic is inherently floating point.

use crate::analysis::Unavailable;
use rust_decimal::Decimal;

/// Adds `value` to `sum`. An overflow makes `statistic` unavailable instead of panicking.
pub(crate) fn accumulate(
    sum: &mut Decimal,
    value: Decimal,
    statistic: &'static str,
) -> Result<(), Unavailable> {
    *sum = sum
        .checked_add(value)
        .ok_or_else(|| Unavailable::degenerate(statistic, "sum overflowed"))?;
    Ok(())
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (ddof = 0).
pub(crate) fn std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Linear interpolation between closest ranks. `sorted` must be ascending and non-empty and `p` in
/// `[0, 1]`.
pub(crate) fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
}
