//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, TIFF) and produces both the
//! decoded RGB image (kept for the annotated overlay) and a
//! single-channel grayscale image for segmentation.
//!
//! This is the first step in the pipeline: raw bytes in, images out.

use image::{GrayImage, RgbImage};

use crate::types::AnalysisError;

/// Decode raw image bytes into an RGB image and its grayscale version.
///
/// Supports PNG, JPEG, and TIFF (whatever the `image` crate can
/// decode). The standard luminance formula is used for RGB-to-gray
/// conversion: `0.299*R + 0.587*G + 0.114*B`.
///
/// The RGB image is retained because the renderer draws the
/// measurement grid onto a copy of the original.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyInput`] if `bytes` is empty.
/// Returns [`AnalysisError::ImageRead`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb_and_grayscale(bytes: &[u8]) -> Result<(RgbImage, GrayImage), AnalysisError> {
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let img = image::load_from_memory(bytes).map_err(AnalysisError::ImageRead)?;
    Ok((img.to_rgb8(), img.to_luma8()))
}
