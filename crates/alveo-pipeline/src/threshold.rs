//! Automatic global thresholding.
//!
//! Otsu's method selects the intensity cutoff that minimizes the
//! combined intra-class variance of the two resulting pixel classes.
//! The level is a pure function of the image histogram; segmentation
//! then classifies pixels strictly below it as tissue (darker regions
//! are tissue under H&E-style staining, where unstained airspace
//! appears light).

use image::GrayImage;

/// Compute the Otsu threshold level for a grayscale image.
///
/// Delegates to [`imageproc::contrast::otsu_level`]. The returned
/// level is used exclusively with a strict `<` comparison by
/// [`TissueMask::from_grayscale`](crate::mask::TissueMask::from_grayscale).
#[must_use = "returns the computed threshold level"]
pub fn otsu_level(image: &GrayImage) -> u8 {
    imageproc::contrast::otsu_level(image)
}
