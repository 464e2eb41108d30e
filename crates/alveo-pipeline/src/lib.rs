//! alveo-pipeline: Pure MLI image analysis pipeline (sans-IO).
//!
//! Computes the mean linear intercept (MLI), a stereological metric
//! of airspace size, from lung histology images through:
//! decode + grayscale -> optional Gaussian denoise -> Otsu tissue
//! segmentation -> measurement-grid placement -> boundary-intercept
//! counting -> per-line and per-image MLI -> annotated overlay
//! rendering.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Upload handling, record
//! persistence and spreadsheet export live in `alveo-io` and
//! `alveo-export`.

pub mod blur;
pub mod grayscale;
pub mod grid;
pub mod intercept;
pub mod mask;
pub mod metrics;
pub mod render;
pub mod threshold;
pub mod types;

pub use mask::TissueMask;
pub use render::{EncodedOverlays, OverlayCanvas};
pub use types::{
    AnalysisConfig, AnalysisError, Axis, ImageMetrics, LineMetrics, MeasurementLine,
};

use types::{GrayImage, RgbImage};

/// Segment tissue from background.
///
/// Converts to grayscale, optionally pre-blurs with
/// `config.sigma_denoise`, thresholds with Otsu's method (tissue is
/// strictly below the level), and optionally removes tissue
/// components smaller than `config.min_area` pixels.
///
/// Exposed separately from [`analyze`] so callers can preview the
/// segmentation without running the full measurement pass.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`AnalysisError::ImageRead`] if the image cannot be decoded.
pub fn segment(
    image_bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<(RgbImage, TissueMask), AnalysisError> {
    let (original, gray) = grayscale::decode_rgb_and_grayscale(image_bytes)?;
    let mask = segment_grayscale(&gray, config);
    Ok((original, mask))
}

/// Segmentation core over an already-decoded grayscale image.
#[must_use]
pub fn segment_grayscale(gray: &GrayImage, config: &AnalysisConfig) -> TissueMask {
    let blurred = blur::gaussian_blur(gray, config.sigma_denoise);
    let level = threshold::otsu_level(&blurred);
    let mask = TissueMask::from_grayscale(&blurred, level);
    mask::remove_small_objects(&mask, config.min_area)
}

/// Place and measure every line of the grid against a tissue mask.
///
/// Returns the horizontal lines (by increasing row) and the vertical
/// lines (by increasing column), each carrying its intercept indices
/// and configured physical length. Pure measurement; no rendering.
#[must_use]
pub fn measure_lines(
    mask: &TissueMask,
    config: &AnalysisConfig,
) -> (Vec<MeasurementLine>, Vec<MeasurementLine>) {
    let horizontal = grid::line_positions(mask.height(), config.n_lines_horizontal)
        .into_iter()
        .map(|position| MeasurementLine {
            axis: Axis::Horizontal,
            position,
            intercept_indices: intercept::transition_indices(&mask.row_samples(position)),
            length_um: config.line_length_um_horizontal,
        })
        .collect();

    let vertical = grid::line_positions(mask.width(), config.n_lines_vertical)
        .into_iter()
        .map(|position| MeasurementLine {
            axis: Axis::Vertical,
            position,
            intercept_indices: intercept::transition_indices(&mask.column_samples(position)),
            length_um: config.line_length_um_vertical,
        })
        .collect();

    (horizontal, vertical)
}

/// Run the full MLI analysis on one image.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decode the image and segment tissue ([`segment`])
/// 3. Place the measurement grid and count intercepts
///    ([`measure_lines`])
/// 4. Draw every line and marker onto both overlays (all horizontal
///    lines by increasing position, then all vertical lines)
/// 5. Aggregate per-row metrics and the image average
/// 6. Encode the overlays as base64 PNG
///
/// The run is all-or-nothing: any failure aborts the image's analysis
/// without a partial result. The pipeline is deterministic, so
/// repeated runs on the same input are bit-identical.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidConfig`] for invariant violations,
/// [`AnalysisError::EmptyInput`] / [`AnalysisError::ImageRead`] when
/// the image cannot be decoded, and [`AnalysisError::ImageEncode`]
/// when an overlay cannot be serialized.
pub fn analyze(
    image_bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<ImageMetrics, AnalysisError> {
    config.validate()?;

    let (original, mask) = segment(image_bytes, config)?;
    let (horizontal, vertical) = measure_lines(&mask, config);

    let mut canvas = OverlayCanvas::new(&original, &mask);
    for line in horizontal.iter().chain(&vertical) {
        canvas.draw_line(line);
    }

    let lines = metrics::aggregate(&horizontal, &vertical);
    let average_mli_um = metrics::average_mli(&lines);
    let overlays = canvas.encode()?;

    Ok(ImageMetrics {
        lines,
        average_mli_um,
        processed_image_base64: overlays.processed_image_base64,
        threshold_image_base64: overlays.threshold_image_base64,
    })
}
