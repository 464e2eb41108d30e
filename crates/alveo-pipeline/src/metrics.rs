//! Line metrics aggregation and MLI derivation.
//!
//! Pairs the i-th horizontal measurement line with the i-th vertical
//! one into logical grid rows, derives a per-row mean linear
//! intercept, and averages the defined rows into an image-level MLI.
//!
//! Undefined values stay `None` end-to-end: a row with zero total
//! intercepts has no MLI, and such rows are excluded from the image
//! average rather than being coerced to zero.

use crate::types::{LineMetrics, MeasurementLine};

/// Combine ordered horizontal and vertical line results into logical
/// grid rows.
///
/// The output has `max(H, V)` rows. Row `i` pairs horizontal line `i`
/// with vertical line `i`; an absent side (when the axis counts
/// differ) contributes zero intercepts and zero length. Per-row MLI is
/// total length over total intercepts, or `None` when the row has no
/// intercepts -- division by zero never happens and zero is never
/// substituted.
#[must_use]
pub fn aggregate(horizontal: &[MeasurementLine], vertical: &[MeasurementLine]) -> Vec<LineMetrics> {
    let rows = horizontal.len().max(vertical.len());

    (0..rows)
        .map(|i| {
            let h = horizontal.get(i);
            let v = vertical.get(i);

            let horizontal_intercepts = h.map_or(0, MeasurementLine::intercepts);
            let vertical_intercepts = v.map_or(0, MeasurementLine::intercepts);
            let horizontal_length_um = h.map_or(0.0, |line| line.length_um);
            let vertical_length_um = v.map_or(0.0, |line| line.length_um);

            let total_line_length_um = horizontal_length_um + vertical_length_um;
            let total_intercepts = horizontal_intercepts + vertical_intercepts;
            let mean_linear_intercept_um = (total_intercepts > 0)
                .then(|| total_line_length_um / f64::from(total_intercepts));

            LineMetrics {
                line_number: u32::try_from(i + 1).unwrap_or(u32::MAX),
                horizontal_intercepts,
                vertical_intercepts,
                horizontal_length_um,
                vertical_length_um,
                total_line_length_um,
                mean_linear_intercept_um,
            }
        })
        .collect()
}

/// Arithmetic mean of all defined per-row MLI values.
///
/// Rows with an undefined MLI are filtered out, not zeroed. Returns
/// `None` when no row has a defined MLI.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_mli(lines: &[LineMetrics]) -> Option<f64> {
    let defined: Vec<f64> = lines
        .iter()
        .filter_map(|line| line.mean_linear_intercept_um)
        .collect();

    if defined.is_empty() {
        return None;
    }
    Some(defined.iter().sum::<f64>() / defined.len() as f64)
}
