//! Persistent record types: animals, uploaded images, and analysis
//! results.
//!
//! All timestamps are Unix epoch seconds. They serve only as opaque
//! ordering keys (images are listed in upload order), so no calendar
//! arithmetic is ever performed on them.

use alveo_pipeline::LineMetrics;
use serde::{Deserialize, Serialize};

/// One specimen grouping a set of uploaded images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRecord {
    /// Caller-chosen animal identifier.
    pub animal_id: String,
    /// Creation time, Unix epoch seconds.
    pub created_at: u64,
}

/// One uploaded image file belonging to an animal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// SipHash-derived hex identifier, unique within the store.
    pub image_id: String,
    /// Owning animal.
    pub animal_id: String,
    /// Filename as supplied at upload time.
    pub original_filename: String,
    /// Absolute path of the stored copy inside the upload directory.
    pub stored_path: String,
    /// Upload size in bytes.
    pub size: u64,
    /// Upload time, Unix epoch seconds.
    pub uploaded_at: u64,
}

/// Per-image slice of a persisted analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisImageResult {
    /// The analyzed image's record id.
    pub image_id: String,
    /// 1-based position of the image within the animal's run.
    pub image_number: u32,
    /// Display name (the original filename).
    pub name: String,
    /// Image-level average MLI; `None` when no line row had a
    /// defined MLI.
    pub average_mli_um: Option<f64>,
    /// Annotated original image, base64 PNG.
    pub processed_image_base64: String,
    /// Annotated mask visualization, base64 PNG.
    pub threshold_image_base64: String,
    /// Ordered per-row metrics from the pipeline.
    pub lines: Vec<LineMetrics>,
}

/// A complete persisted analysis run for one animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The analyzed animal.
    pub animal_id: String,
    /// Generation time, Unix epoch seconds.
    pub generated_at: u64,
    /// Per-image results in analysis order.
    pub images: Vec<AnalysisImageResult>,
}
