//! Measurement-grid placement.
//!
//! Computes evenly spaced integer pixel positions for the horizontal
//! and vertical measurement lines. Dividing the axis into `count + 1`
//! intervals keeps lines off the image border.

/// Evenly spaced line positions along an axis of `length` pixels.
///
/// Position `i` (0-indexed) is `round(length / (count + 1) * (i + 1))`,
/// so the returned positions lie strictly inside the axis and are
/// strictly increasing. `count == 0` yields an empty list. No clamping
/// is applied beyond rounding.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn line_positions(length: u32, count: u32) -> Vec<u32> {
    let step = f64::from(length) / f64::from(count + 1);
    (1..=count).map(|i| (step * f64::from(i)).round() as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_yields_empty() {
        assert!(line_positions(100, 0).is_empty());
    }

    #[test]
    fn returns_requested_count() {
        assert_eq!(line_positions(100, 7).len(), 7);
    }

    #[test]
    fn single_line_bisects_axis() {
        assert_eq!(line_positions(100, 1), vec![50]);
    }

    #[test]
    fn three_lines_quarter_the_axis() {
        assert_eq!(line_positions(100, 3), vec![25, 50, 75]);
    }

    #[test]
    fn positions_strictly_inside_and_increasing() {
        for (length, count) in [(100u32, 5u32), (37, 4), (640, 9), (13, 3)] {
            let positions = line_positions(length, count);
            assert_eq!(positions.len(), count as usize);
            for window in positions.windows(2) {
                assert!(window[0] < window[1], "positions must strictly increase");
            }
            for &p in &positions {
                assert!(p > 0 && p < length, "position {p} outside (0, {length})");
            }
        }
    }

    #[test]
    fn spacing_is_even_within_rounding() {
        let length = 1000u32;
        let count = 6u32;
        let positions = line_positions(length, count);
        let step = f64::from(length) / f64::from(count + 1);
        for (i, &p) in positions.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let expected = step * (i as f64 + 1.0);
            assert!(
                (f64::from(p) - expected).abs() <= 0.5,
                "position {p} deviates from even spacing {expected}",
            );
        }
    }

    #[test]
    fn rounding_may_touch_the_edge_for_extreme_counts() {
        // With count close to length, rounding can land on length - 1.
        // That is accepted, not an error.
        let positions = line_positions(10, 9);
        assert_eq!(positions.len(), 9);
        assert!(positions.iter().all(|&p| p <= 9));
    }
}
