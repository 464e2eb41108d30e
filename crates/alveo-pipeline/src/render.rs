//! Annotated overlay rendering.
//!
//! Draws the measurement grid and every counted intercept onto two
//! canvases -- a copy of the original image and the tissue-mask
//! visualization -- so an analyst can visually verify each crossing.
//! Horizontal and vertical lines use fixed distinguishing colors; each
//! intercept gets a composite marker (dark ring, tilted cross, filled
//! center dot). Both canvases are then PNG-encoded losslessly and
//! base64-encoded for transport.
//!
//! Rendering is purely additive and order-independent across lines, so
//! the orchestrator runs it as a second pass after measurement.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};

use crate::mask::TissueMask;
use crate::types::{AnalysisError, Axis, MeasurementLine};

/// Stroke color for horizontal measurement lines (orange).
pub const HORIZONTAL_LINE_COLOR: Rgb<u8> = Rgb([255, 176, 0]);
/// Stroke color for vertical measurement lines (green).
pub const VERTICAL_LINE_COLOR: Rgb<u8> = Rgb([0, 255, 76]);

const MARKER_RING_COLOR: Rgb<u8> = Rgb([40, 40, 40]);
const MARKER_CROSS_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const MARKER_DOT_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

const MARKER_RING_RADIUS: i32 = 8;
const MARKER_DOT_RADIUS: i32 = 4;
const MARKER_CROSS_HALF_ARM: f32 = 15.0;

/// Both overlays after lossless PNG encoding and base64 wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOverlays {
    /// Original image with grid and markers.
    pub processed_image_base64: String,
    /// Mask visualization with grid and markers.
    pub threshold_image_base64: String,
}

/// Drawing surface holding both overlay canvases.
#[derive(Debug, Clone)]
pub struct OverlayCanvas {
    processed: RgbImage,
    threshold: RgbImage,
}

impl OverlayCanvas {
    /// Start overlays from the original image and the tissue mask.
    ///
    /// The threshold canvas shows tissue as white on black, expanded
    /// to RGB so colored annotations read on it.
    #[must_use]
    pub fn new(original: &RgbImage, mask: &TissueMask) -> Self {
        let visual = mask.to_visual();
        let threshold = RgbImage::from_fn(visual.width(), visual.height(), |x, y| {
            let v = visual.get_pixel(x, y).0[0];
            Rgb([v, v, v])
        });
        Self {
            processed: original.clone(),
            threshold,
        }
    }

    /// Draw one measurement line and its intercept markers onto both
    /// canvases.
    pub fn draw_line(&mut self, line: &MeasurementLine) {
        let (width, height) = (self.processed.width(), self.processed.height());
        match line.axis {
            Axis::Horizontal => {
                draw_axis_line(
                    &mut self.processed,
                    line.axis,
                    line.position,
                    width,
                    HORIZONTAL_LINE_COLOR,
                );
                draw_axis_line(
                    &mut self.threshold,
                    line.axis,
                    line.position,
                    width,
                    HORIZONTAL_LINE_COLOR,
                );
            }
            Axis::Vertical => {
                draw_axis_line(
                    &mut self.processed,
                    line.axis,
                    line.position,
                    height,
                    VERTICAL_LINE_COLOR,
                );
                draw_axis_line(
                    &mut self.threshold,
                    line.axis,
                    line.position,
                    height,
                    VERTICAL_LINE_COLOR,
                );
            }
        }

        for &index in &line.intercept_indices {
            let (x, y) = match line.axis {
                Axis::Horizontal => (index, line.position),
                Axis::Vertical => (line.position, index),
            };
            draw_intercept_marker(&mut self.processed, x, y);
            draw_intercept_marker(&mut self.threshold, x, y);
        }
    }

    /// The original-image overlay as drawn so far.
    #[must_use]
    pub const fn processed(&self) -> &RgbImage {
        &self.processed
    }

    /// The mask-visualization overlay as drawn so far.
    #[must_use]
    pub const fn threshold(&self) -> &RgbImage {
        &self.threshold
    }

    /// PNG-encode both canvases and wrap them in base64.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ImageEncode`] if PNG serialization
    /// fails.
    pub fn encode(&self) -> Result<EncodedOverlays, AnalysisError> {
        Ok(EncodedOverlays {
            processed_image_base64: BASE64.encode(encode_png(&self.processed)?),
            threshold_image_base64: BASE64.encode(encode_png(&self.threshold)?),
        })
    }
}

/// Draw a full-length axis-aligned line with a 3 px stroke.
///
/// `imageproc` draws 1 px segments, so the stroke is built from three
/// adjacent parallel segments; offsets falling outside the canvas are
/// skipped.
#[allow(clippy::cast_precision_loss)]
fn draw_axis_line(canvas: &mut RgbImage, axis: Axis, position: u32, extent: u32, color: Rgb<u8>) {
    if extent == 0 {
        return;
    }
    let end = (extent - 1) as f32;
    for offset in -1i64..=1 {
        let Ok(fixed) = u32::try_from(i64::from(position) + offset) else {
            continue;
        };
        let fixed = fixed as f32;
        let (start, stop) = match axis {
            Axis::Horizontal => ((0.0, fixed), (end, fixed)),
            Axis::Vertical => ((fixed, 0.0), (fixed, end)),
        };
        draw_line_segment_mut(canvas, start, stop, color);
    }
}

/// Composite intercept marker: dark hollow ring, yellow tilted cross,
/// filled magenta center dot.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
fn draw_intercept_marker(canvas: &mut RgbImage, x: u32, y: u32) {
    let center = (x as i32, y as i32);

    // Three concentric hollow circles approximate the ring's stroke width.
    for radius in (MARKER_RING_RADIUS - 1)..=(MARKER_RING_RADIUS + 1) {
        draw_hollow_circle_mut(canvas, center, radius, MARKER_RING_COLOR);
    }

    let (fx, fy) = (x as f32, y as f32);
    let a = MARKER_CROSS_HALF_ARM;
    draw_line_segment_mut(canvas, (fx - a, fy - a), (fx + a, fy + a), MARKER_CROSS_COLOR);
    draw_line_segment_mut(canvas, (fx - a, fy + a), (fx + a, fy - a), MARKER_CROSS_COLOR);

    draw_filled_circle_mut(canvas, center, MARKER_DOT_RADIUS, MARKER_DOT_COLOR);
}

/// Losslessly serialize an RGB canvas to PNG bytes.
fn encode_png(img: &RgbImage) -> Result<Vec<u8>, AnalysisError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .map_err(AnalysisError::ImageEncode)?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn blank_canvas(width: u32, height: u32) -> OverlayCanvas {
        let original = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
        let gray = GrayImage::from_pixel(width, height, image::Luma([240]));
        let mask = TissueMask::from_grayscale(&gray, 128);
        OverlayCanvas::new(&original, &mask)
    }

    fn horizontal_line(position: u32, indices: Vec<u32>) -> MeasurementLine {
        MeasurementLine {
            axis: Axis::Horizontal,
            position,
            intercept_indices: indices,
            length_um: 100.0,
        }
    }

    #[test]
    fn threshold_canvas_reflects_mask() {
        let gray = GrayImage::from_fn(4, 4, |x, _| {
            if x < 2 { image::Luma([10]) } else { image::Luma([250]) }
        });
        let mask = TissueMask::from_grayscale(&gray, 128);
        let original = RgbImage::new(4, 4);
        let canvas = OverlayCanvas::new(&original, &mask);
        assert_eq!(canvas.threshold().get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(canvas.threshold().get_pixel(3, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn horizontal_line_spans_full_width() {
        let mut canvas = blank_canvas(40, 40);
        canvas.draw_line(&horizontal_line(20, vec![]));
        for x in 0..40 {
            assert_eq!(
                canvas.processed().get_pixel(x, 20),
                &HORIZONTAL_LINE_COLOR,
                "expected line color across row at x={x}",
            );
        }
        // 3px stroke covers the adjacent rows as well.
        assert_eq!(canvas.processed().get_pixel(5, 19), &HORIZONTAL_LINE_COLOR);
        assert_eq!(canvas.processed().get_pixel(5, 21), &HORIZONTAL_LINE_COLOR);
        assert_ne!(canvas.processed().get_pixel(5, 25), &HORIZONTAL_LINE_COLOR);
    }

    #[test]
    fn vertical_line_spans_full_height() {
        let mut canvas = blank_canvas(40, 40);
        canvas.draw_line(&MeasurementLine {
            axis: Axis::Vertical,
            position: 12,
            intercept_indices: vec![],
            length_um: 100.0,
        });
        for y in 0..40 {
            assert_eq!(canvas.processed().get_pixel(12, y), &VERTICAL_LINE_COLOR);
        }
    }

    #[test]
    fn line_at_border_does_not_panic() {
        let mut canvas = blank_canvas(20, 20);
        canvas.draw_line(&horizontal_line(0, vec![]));
        canvas.draw_line(&horizontal_line(19, vec![]));
        assert_eq!(canvas.processed().get_pixel(5, 0), &HORIZONTAL_LINE_COLOR);
        assert_eq!(canvas.processed().get_pixel(5, 19), &HORIZONTAL_LINE_COLOR);
    }

    #[test]
    fn marker_is_drawn_on_both_canvases() {
        let mut canvas = blank_canvas(60, 60);
        canvas.draw_line(&horizontal_line(30, vec![30]));
        // The filled center dot lands exactly on the intercept.
        assert_eq!(canvas.processed().get_pixel(30, 30), &Rgb([255, 0, 255]));
        assert_eq!(canvas.threshold().get_pixel(30, 30), &Rgb([255, 0, 255]));
    }

    #[test]
    fn marker_near_border_does_not_panic() {
        let mut canvas = blank_canvas(20, 20);
        canvas.draw_line(&horizontal_line(1, vec![0, 19]));
        assert_eq!(canvas.processed().get_pixel(0, 1), &Rgb([255, 0, 255]));
    }

    #[test]
    fn encode_produces_nonempty_base64_png() {
        let canvas = blank_canvas(16, 16);
        let encoded = canvas.encode().unwrap();
        assert!(!encoded.processed_image_base64.is_empty());
        assert!(!encoded.threshold_image_base64.is_empty());

        // Round-trip: the payload must decode back to a PNG.
        let bytes = BASE64.decode(&encoded.processed_image_base64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut canvas = blank_canvas(32, 32);
        canvas.draw_line(&horizontal_line(16, vec![8]));
        let first = canvas.encode().unwrap();
        let second = canvas.encode().unwrap();
        assert_eq!(first, second);
    }
}
