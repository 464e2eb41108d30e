//! Shared types for the alveo MLI analysis pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// decoded source image without depending on `image` directly.
pub use image::RgbImage;

/// Maximum accepted length of the magnification label, in characters.
pub const MAX_MAGNIFICATION_LEN: usize = 20;

/// Configuration for one MLI analysis run.
///
/// One immutable value per analysis invocation. All physical
/// quantities are in micrometers; the grid is described by the number
/// of horizontal and vertical measurement lines and their configured
/// physical lengths.
///
/// # Invariants
///
/// Enforced by [`AnalysisConfig::validate`], which the orchestrator
/// calls before touching pixel data:
///
/// - `scale_um_per_pixel`, `line_length_um_horizontal` and
///   `line_length_um_vertical` are strictly positive and finite
/// - `n_lines_horizontal` and `n_lines_vertical` are at least 1
/// - `sigma_denoise` is non-negative and finite (0 disables the blur)
/// - `magnification` is non-empty after trimming and at most
///   [`MAX_MAGNIFICATION_LEN`] characters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Physical scale of the image in micrometers per pixel.
    pub scale_um_per_pixel: f64,

    /// Configured physical length of each horizontal measurement line.
    pub line_length_um_horizontal: f64,

    /// Configured physical length of each vertical measurement line.
    pub line_length_um_vertical: f64,

    /// Number of horizontal measurement lines to place.
    pub n_lines_horizontal: u32,

    /// Number of vertical measurement lines to place.
    pub n_lines_vertical: u32,

    /// Gaussian blur sigma applied before thresholding.
    /// Zero disables the blur entirely.
    pub sigma_denoise: f32,

    /// Minimum connected-component area (pixels) kept in the tissue
    /// mask. Zero disables small-object removal.
    pub min_area: u32,

    /// Free-text magnification label (e.g., `"20x"`), carried through
    /// to result records unmodified apart from trimming.
    pub magnification: String,
}

impl AnalysisConfig {
    /// Default physical scale in micrometers per pixel.
    pub const DEFAULT_SCALE_UM_PER_PIXEL: f64 = 1.0;
    /// Default horizontal line length in micrometers.
    pub const DEFAULT_LINE_LENGTH_UM_HORIZONTAL: f64 = 200.0;
    /// Default vertical line length in micrometers.
    pub const DEFAULT_LINE_LENGTH_UM_VERTICAL: f64 = 200.0;
    /// Default number of horizontal measurement lines.
    pub const DEFAULT_N_LINES_HORIZONTAL: u32 = 5;
    /// Default number of vertical measurement lines.
    pub const DEFAULT_N_LINES_VERTICAL: u32 = 5;
    /// Default denoise sigma (blur disabled).
    pub const DEFAULT_SIGMA_DENOISE: f32 = 0.0;
    /// Default minimum object area (removal disabled).
    pub const DEFAULT_MIN_AREA: u32 = 0;
    /// Default magnification label.
    pub const DEFAULT_MAGNIFICATION: &'static str = "20x";

    /// The magnification label with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed_magnification(&self) -> &str {
        self.magnification.trim()
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] naming the first field
    /// that violates its invariant.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.scale_um_per_pixel.is_finite() && self.scale_um_per_pixel > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "scale_um_per_pixel must be strictly positive, got {}",
                self.scale_um_per_pixel
            )));
        }
        if !(self.line_length_um_horizontal.is_finite() && self.line_length_um_horizontal > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "line_length_um_horizontal must be strictly positive, got {}",
                self.line_length_um_horizontal
            )));
        }
        if !(self.line_length_um_vertical.is_finite() && self.line_length_um_vertical > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "line_length_um_vertical must be strictly positive, got {}",
                self.line_length_um_vertical
            )));
        }
        if self.n_lines_horizontal < 1 {
            return Err(AnalysisError::InvalidConfig(
                "n_lines_horizontal must be at least 1".to_string(),
            ));
        }
        if self.n_lines_vertical < 1 {
            return Err(AnalysisError::InvalidConfig(
                "n_lines_vertical must be at least 1".to_string(),
            ));
        }
        if !(self.sigma_denoise.is_finite() && self.sigma_denoise >= 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "sigma_denoise must be non-negative, got {}",
                self.sigma_denoise
            )));
        }
        let magnification = self.trimmed_magnification();
        if magnification.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "magnification must not be empty".to_string(),
            ));
        }
        if magnification.chars().count() > MAX_MAGNIFICATION_LEN {
            return Err(AnalysisError::InvalidConfig(format!(
                "magnification must be at most {MAX_MAGNIFICATION_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scale_um_per_pixel: Self::DEFAULT_SCALE_UM_PER_PIXEL,
            line_length_um_horizontal: Self::DEFAULT_LINE_LENGTH_UM_HORIZONTAL,
            line_length_um_vertical: Self::DEFAULT_LINE_LENGTH_UM_VERTICAL,
            n_lines_horizontal: Self::DEFAULT_N_LINES_HORIZONTAL,
            n_lines_vertical: Self::DEFAULT_N_LINES_VERTICAL,
            sigma_denoise: Self::DEFAULT_SIGMA_DENOISE,
            min_area: Self::DEFAULT_MIN_AREA,
            magnification: Self::DEFAULT_MAGNIFICATION.to_string(),
        }
    }
}

/// Orientation of a measurement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// The line runs along a fixed row, sampling every column.
    Horizontal,
    /// The line runs along a fixed column, sampling every row.
    Vertical,
}

/// One measurement line and the intercepts found along it.
///
/// `position` is the fixed pixel coordinate: the row for a horizontal
/// line, the column for a vertical line. `intercept_indices` are the
/// sample offsets along the line where the tissue classification
/// flips; their pixel coordinate on the free axis equals the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementLine {
    /// Orientation of the line.
    pub axis: Axis,
    /// Fixed pixel coordinate (row or column depending on `axis`).
    pub position: u32,
    /// Sample indices along the line where an intercept occurs.
    pub intercept_indices: Vec<u32>,
    /// Configured physical length of the line in micrometers.
    pub length_um: f64,
}

impl MeasurementLine {
    /// Number of intercepts found along this line.
    #[must_use]
    pub fn intercepts(&self) -> u32 {
        self.intercept_indices.len().try_into().unwrap_or(u32::MAX)
    }
}

/// Per-row metrics for one logical grid row.
///
/// A row pairs the i-th horizontal line with the i-th vertical line;
/// when the axis counts differ the absent side contributes zero
/// intercepts and zero length (see `metrics::aggregate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMetrics {
    /// 1-based row number.
    pub line_number: u32,
    /// Intercepts counted along the paired horizontal line.
    pub horizontal_intercepts: u32,
    /// Intercepts counted along the paired vertical line.
    pub vertical_intercepts: u32,
    /// Physical length of the horizontal side in micrometers.
    pub horizontal_length_um: f64,
    /// Physical length of the vertical side in micrometers.
    pub vertical_length_um: f64,
    /// Combined physical length of both sides in micrometers.
    pub total_line_length_um: f64,
    /// Mean linear intercept for this row: total length divided by
    /// total intercepts. `None` when the row has no intercepts at all
    /// -- never zero, never infinite.
    pub mean_linear_intercept_um: Option<f64>,
}

/// Complete metrics for one analyzed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetrics {
    /// Ordered per-row metrics.
    pub lines: Vec<LineMetrics>,
    /// Mean of all defined per-row MLI values; `None` when no row has
    /// a defined MLI.
    pub average_mli_um: Option<f64>,
    /// Original image with the measurement grid and intercept markers
    /// drawn on it, PNG-encoded then base64-encoded.
    pub processed_image_base64: String,
    /// Tissue-mask visualization with the same overlay, PNG-encoded
    /// then base64-encoded.
    pub threshold_image_base64: String,
}

/// Errors that can occur during MLI analysis.
///
/// Every variant is fatal for the image being analyzed: the pipeline
/// never returns a partial result and never retries.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The source image could not be decoded.
    #[error("failed to read image: {0}")]
    ImageRead(#[source] image::ImageError),

    /// An annotated overlay could not be serialized to PNG.
    #[error("failed to encode overlay image: {0}")]
    ImageEncode(#[source] image::ImageError),

    /// The analysis configuration violates an invariant.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn default_config_matches_constants() {
        let config = AnalysisConfig::default();
        assert!(
            (config.scale_um_per_pixel - AnalysisConfig::DEFAULT_SCALE_UM_PER_PIXEL).abs()
                < f64::EPSILON
        );
        assert_eq!(
            config.n_lines_horizontal,
            AnalysisConfig::DEFAULT_N_LINES_HORIZONTAL
        );
        assert_eq!(
            config.n_lines_vertical,
            AnalysisConfig::DEFAULT_N_LINES_VERTICAL
        );
        assert_eq!(config.min_area, AnalysisConfig::DEFAULT_MIN_AREA);
        assert_eq!(config.magnification, AnalysisConfig::DEFAULT_MAGNIFICATION);
    }

    #[test]
    fn zero_scale_is_rejected() {
        let config = AnalysisConfig {
            scale_um_per_pixel: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(msg)) if msg.contains("scale_um_per_pixel")
        ));
    }

    #[test]
    fn negative_line_length_is_rejected() {
        let config = AnalysisConfig {
            line_length_um_vertical: -10.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(msg)) if msg.contains("line_length_um_vertical")
        ));
    }

    #[test]
    fn zero_line_count_is_rejected() {
        let config = AnalysisConfig {
            n_lines_horizontal: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(msg)) if msg.contains("n_lines_horizontal")
        ));
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let config = AnalysisConfig {
            sigma_denoise: -0.5,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(msg)) if msg.contains("sigma_denoise")
        ));
    }

    #[test]
    fn blank_magnification_is_rejected() {
        let config = AnalysisConfig {
            magnification: "   ".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(msg)) if msg.contains("magnification")
        ));
    }

    #[test]
    fn overlong_magnification_is_rejected() {
        let config = AnalysisConfig {
            magnification: "x".repeat(MAX_MAGNIFICATION_LEN + 1),
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn magnification_is_trimmed() {
        let config = AnalysisConfig {
            magnification: "  40x  ".to_string(),
            ..AnalysisConfig::default()
        };
        assert_eq!(config.trimmed_magnification(), "40x");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn measurement_line_intercepts_matches_indices() {
        let line = MeasurementLine {
            axis: Axis::Horizontal,
            position: 10,
            intercept_indices: vec![2, 4, 9],
            length_um: 100.0,
        };
        assert_eq!(line.intercepts(), 3);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = AnalysisConfig {
            scale_um_per_pixel: 0.65,
            line_length_um_horizontal: 150.0,
            line_length_um_vertical: 120.0,
            n_lines_horizontal: 7,
            n_lines_vertical: 3,
            sigma_denoise: 1.2,
            min_area: 64,
            magnification: "40x".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn undefined_mli_serializes_as_null() {
        let metrics = LineMetrics {
            line_number: 1,
            horizontal_intercepts: 0,
            vertical_intercepts: 0,
            horizontal_length_um: 100.0,
            vertical_length_um: 50.0,
            total_line_length_um: 150.0,
            mean_linear_intercept_um: None,
        };
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(json.contains("\"mean_linear_intercept_um\":null"));
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            AnalysisError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            AnalysisError::InvalidConfig("bad".to_string()).to_string(),
            "invalid analysis configuration: bad"
        );
    }
}
