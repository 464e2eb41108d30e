//! Binary tissue mask and size-based denoising.
//!
//! A [`TissueMask`] classifies every pixel of the source image as
//! tissue or background. Tissue is defined as intensity strictly
//! below the Otsu level, so darker (stained) regions are tissue and
//! light airspace is background.
//!
//! [`remove_small_objects`] drops tissue components smaller than a
//! minimum area using 8-connectivity connected-component labeling.
//! The connectivity choice is fixed and documented here: diagonal
//! neighbors belong to the same component.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

/// A 2D binary tissue/background field with the same dimensions as
/// the source image. `true` means tissue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TissueMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl TissueMask {
    /// Build a mask from a grayscale image and a threshold level.
    ///
    /// A pixel is tissue iff its intensity is strictly below `level`.
    #[must_use]
    pub fn from_grayscale(gray: &GrayImage, level: u8) -> Self {
        let data = gray.pixels().map(|p| p.0[0] < level).collect();
        Self {
            width: gray.width(),
            height: gray.height(),
            data,
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether the pixel at (`x`, `y`) is tissue.
    ///
    /// Out-of-bounds coordinates are background.
    #[must_use]
    pub fn is_tissue(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    /// Tissue membership of every pixel along row `y`, left to right.
    #[must_use]
    pub fn row_samples(&self, y: u32) -> Vec<bool> {
        (0..self.width).map(|x| self.is_tissue(x, y)).collect()
    }

    /// Tissue membership of every pixel along column `x`, top to bottom.
    #[must_use]
    pub fn column_samples(&self, x: u32) -> Vec<bool> {
        (0..self.height).map(|y| self.is_tissue(x, y)).collect()
    }

    /// Total number of tissue pixels.
    #[must_use]
    pub fn tissue_pixel_count(&self) -> usize {
        self.data.iter().filter(|&&t| t).count()
    }

    /// Render the mask as a grayscale image: tissue white (255),
    /// background black (0). Used as the base of the threshold overlay.
    #[must_use]
    pub fn to_visual(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.is_tissue(x, y) { 255 } else { 0 }])
        })
    }
}

/// Remove tissue components smaller than `min_area` pixels.
///
/// Components are labeled with 8-connectivity (diagonal neighbors
/// connect). `min_area == 0` is a no-op. Removal only ever clears
/// tissue pixels, so the tissue count is non-increasing in `min_area`.
#[must_use = "returns the denoised mask"]
pub fn remove_small_objects(mask: &TissueMask, min_area: u32) -> TissueMask {
    if min_area == 0 {
        return mask.clone();
    }

    let labels = connected_components(&mask.to_visual(), Connectivity::Eight, Luma([0u8]));

    // Component areas indexed by label; label 0 is background.
    let max_label = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0);
    let mut areas = vec![0u32; max_label as usize + 1];
    for p in labels.pixels() {
        areas[p.0[0] as usize] += 1;
    }

    let data = labels
        .pixels()
        .map(|p| {
            let label = p.0[0];
            label != 0 && areas[label as usize] >= min_area
        })
        .collect();

    TissueMask {
        width: mask.width,
        height: mask.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 background with a 4x4 tissue block at (2,2) and a single
    /// isolated tissue pixel at (15,15).
    fn block_and_speck() -> TissueMask {
        let gray = GrayImage::from_fn(20, 20, |x, y| {
            let in_block = (2..6).contains(&x) && (2..6).contains(&y);
            let speck = x == 15 && y == 15;
            if in_block || speck { Luma([10]) } else { Luma([240]) }
        });
        TissueMask::from_grayscale(&gray, 128)
    }

    #[test]
    fn threshold_is_strictly_below() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([u8::from(x == 0) * 100 + 27]));
        // Pixels: 127, 27, 27 with level 127: only values < 127 are tissue.
        let mask = TissueMask::from_grayscale(&gray, 127);
        assert!(!mask.is_tissue(0, 0), "value equal to level is background");
        assert!(mask.is_tissue(1, 0));
        assert!(mask.is_tissue(2, 0));
    }

    #[test]
    fn row_and_column_samples_have_image_extent() {
        let mask = block_and_speck();
        assert_eq!(mask.row_samples(3).len(), 20);
        assert_eq!(mask.column_samples(3).len(), 20);
        assert!(mask.row_samples(3)[2]);
        assert!(!mask.row_samples(3)[10]);
        assert!(mask.column_samples(3)[2]);
    }

    #[test]
    fn out_of_bounds_is_background() {
        let mask = block_and_speck();
        assert!(!mask.is_tissue(100, 3));
        assert!(!mask.is_tissue(3, 100));
    }

    #[test]
    fn zero_min_area_is_noop() {
        let mask = block_and_speck();
        assert_eq!(remove_small_objects(&mask, 0), mask);
    }

    #[test]
    fn speck_removed_block_kept() {
        let mask = block_and_speck();
        let cleaned = remove_small_objects(&mask, 4);
        assert!(!cleaned.is_tissue(15, 15), "1px speck should be removed");
        assert!(cleaned.is_tissue(3, 3), "16px block should survive");
        assert_eq!(cleaned.tissue_pixel_count(), 16);
    }

    #[test]
    fn min_area_above_everything_clears_mask() {
        let cleaned = remove_small_objects(&block_and_speck(), 1000);
        assert_eq!(cleaned.tissue_pixel_count(), 0);
    }

    #[test]
    fn removal_is_monotonic_in_min_area() {
        let mask = block_and_speck();
        let mut previous = mask.tissue_pixel_count();
        for min_area in [1, 2, 4, 16, 17, 100] {
            let count = remove_small_objects(&mask, min_area).tissue_pixel_count();
            assert!(
                count <= previous,
                "tissue count grew from {previous} to {count} at min_area={min_area}",
            );
            previous = count;
        }
    }

    #[test]
    fn diagonal_pixels_form_one_component() {
        // Two diagonally adjacent tissue pixels: with 8-connectivity
        // they form a single component of area 2.
        let gray = GrayImage::from_fn(4, 4, |x, y| {
            if (x, y) == (1, 1) || (x, y) == (2, 2) { Luma([0]) } else { Luma([255]) }
        });
        let mask = TissueMask::from_grayscale(&gray, 128);
        let cleaned = remove_small_objects(&mask, 2);
        assert_eq!(
            cleaned.tissue_pixel_count(),
            2,
            "diagonal pair should survive min_area=2 under 8-connectivity",
        );
    }

    #[test]
    fn visual_is_black_and_white() {
        let visual = block_and_speck().to_visual();
        assert!(visual.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(visual.get_pixel(3, 3).0[0], 255);
        assert_eq!(visual.get_pixel(10, 10).0[0], 0);
    }
}
