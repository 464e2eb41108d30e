//! alveo-export: Pure spreadsheet serializer (sans-IO).
//!
//! Turns a collection of persisted [`AnalysisResult`] aggregates into
//! a CSV spreadsheet: one row per measurement line, one summary row
//! per image. This is pure data transformation over already-computed
//! metrics -- it returns a `String` and performs no I/O.

use alveo_io::AnalysisResult;

/// Errors from spreadsheet serialization.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The CSV writer rejected a record.
    #[error("failed to write CSV record: {0}")]
    Csv(#[from] csv::Error),

    /// The underlying buffer could not be recovered.
    #[error("failed to finalize CSV output: {0}")]
    Io(#[from] std::io::Error),

    /// The produced bytes were not valid UTF-8.
    #[error("CSV output was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Column headers, in output order.
const HEADERS: [&str; 6] = [
    "Animal",
    "Image #",
    "Line #",
    "Horizontal Intercepts",
    "Vertical Intercepts",
    "MLI (um)",
];

/// Serialize analysis results to a CSV spreadsheet string.
///
/// Animals are labeled `Animal 1..N` in iteration order. Each image
/// contributes one row per line followed by a summary row carrying the
/// image-level average MLI. An undefined MLI renders as an empty cell,
/// never as zero.
///
/// # Errors
///
/// Returns [`ExportError`] if CSV serialization fails; with an
/// in-memory buffer this indicates a bug rather than an environmental
/// problem.
pub fn results_to_csv(results: &[AnalysisResult]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for (animal_index, result) in results.iter().enumerate() {
        let animal_label = format!("Animal {}", animal_index + 1);
        for image in &result.images {
            for line in &image.lines {
                writer.write_record([
                    animal_label.clone(),
                    image.image_number.to_string(),
                    line.line_number.to_string(),
                    line.horizontal_intercepts.to_string(),
                    line.vertical_intercepts.to_string(),
                    format_mli(line.mean_linear_intercept_um),
                ])?;
            }
            writer.write_record([
                format!("{animal_label} - Image {} average", image.image_number),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format_mli(image.average_mli_um),
            ])?;
        }
    }

    writer.flush()?;
    let bytes = writer
        .into_inner()
        .map_err(csv::IntoInnerError::into_error)?;
    Ok(String::from_utf8(bytes)?)
}

/// An undefined MLI becomes an empty cell; a defined one keeps full
/// float precision.
fn format_mli(mli: Option<f64>) -> String {
    mli.map_or_else(String::new, |value| value.to_string())
}
