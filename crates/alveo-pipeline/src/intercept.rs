//! Boundary-intercept detection along a measurement line.
//!
//! An intercept is any sample index `i > 0` where the tissue
//! membership differs from the previous sample -- the first
//! difference of the boolean signal is nonzero. The intercept count
//! is simply the number of such indices.

/// Indices where the tissue classification flips along a sample run.
///
/// An all-tissue or all-background line has no transitions. Empty
/// input yields an empty list.
#[must_use]
pub fn transition_indices(samples: &[bool]) -> Vec<u32> {
    samples
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] != pair[1])
        .map(|(i, _)| u32::try_from(i + 1).unwrap_or(u32::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_transitions() {
        assert!(transition_indices(&[]).is_empty());
    }

    #[test]
    fn single_sample_has_no_transitions() {
        assert!(transition_indices(&[true]).is_empty());
        assert!(transition_indices(&[false]).is_empty());
    }

    #[test]
    fn all_tissue_has_no_transitions() {
        assert!(transition_indices(&[true; 8]).is_empty());
    }

    #[test]
    fn all_background_has_no_transitions() {
        assert!(transition_indices(&[false; 8]).is_empty());
    }

    #[test]
    fn tissue_block_yields_entry_and_exit() {
        // [tissue, tissue, background, background, tissue]
        // transitions at indices 2 and 4.
        let samples = [true, true, false, false, true];
        assert_eq!(transition_indices(&samples), vec![2, 4]);
    }

    #[test]
    fn alternating_samples_flip_everywhere() {
        let samples = [true, false, true, false];
        assert_eq!(transition_indices(&samples), vec![1, 2, 3]);
    }

    #[test]
    fn transition_at_first_pair_is_index_one() {
        assert_eq!(transition_indices(&[false, true]), vec![1]);
    }
}
