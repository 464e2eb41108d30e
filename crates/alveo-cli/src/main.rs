//! alveo: CLI driver for batch MLI analysis.
//!
//! Runs the MLI pipeline over one or more histology images (or
//! directories of images) grouped under a single animal label, then
//! writes the annotated overlays and a CSV spreadsheet of the
//! results. Optionally registers uploads and results in a persistent
//! state store.
//!
//! A failure on one image is logged and skipped; the remaining images
//! in the batch still run. The exit code is non-zero only when no
//! image could be analyzed.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin alveo -- [OPTIONS] <INPUTS>...
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::Parser;

use alveo_io::{AnalysisImageResult, AnalysisResult, StateStore};
use alveo_pipeline::AnalysisConfig;

/// Batch MLI analysis over histology images.
///
/// Analyzes every given image with one shared configuration and
/// produces per-line and per-image mean linear intercept metrics,
/// annotated verification overlays, and a CSV spreadsheet.
#[derive(Parser)]
#[command(name = "alveo", version)]
struct Cli {
    /// Image files or directories of images (PNG, JPEG, TIFF).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Animal label grouping this batch.
    #[arg(long, default_value = "animal-1")]
    animal: String,

    /// Physical scale in micrometers per pixel.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_SCALE_UM_PER_PIXEL)]
    scale_um_per_pixel: f64,

    /// Physical length of each horizontal line in micrometers.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_LINE_LENGTH_UM_HORIZONTAL)]
    line_length_um_horizontal: f64,

    /// Physical length of each vertical line in micrometers.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_LINE_LENGTH_UM_VERTICAL)]
    line_length_um_vertical: f64,

    /// Number of horizontal measurement lines.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_N_LINES_HORIZONTAL)]
    n_lines_horizontal: u32,

    /// Number of vertical measurement lines.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_N_LINES_VERTICAL)]
    n_lines_vertical: u32,

    /// Gaussian denoise sigma (0 disables the blur).
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_SIGMA_DENOISE)]
    sigma_denoise: f32,

    /// Minimum tissue component area in pixels (0 disables removal).
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_MIN_AREA)]
    min_area: u32,

    /// Magnification label recorded with the results.
    #[arg(long, default_value = AnalysisConfig::DEFAULT_MAGNIFICATION)]
    magnification: String,

    /// Full analysis config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `AnalysisConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Directory for annotated overlays and `results.csv`.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Persistent state store directory; when set, uploads and the
    /// analysis result are recorded there.
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Print the full analysis result as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

/// Build an [`AnalysisConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and
/// the individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<AnalysisConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(AnalysisConfig {
        scale_um_per_pixel: cli.scale_um_per_pixel,
        line_length_um_horizontal: cli.line_length_um_horizontal,
        line_length_um_vertical: cli.line_length_um_vertical,
        n_lines_horizontal: cli.n_lines_horizontal,
        n_lines_vertical: cli.n_lines_vertical,
        sigma_denoise: cli.sigma_denoise,
        min_area: cli.min_area,
        magnification: cli.magnification.clone(),
    })
}

/// Expand inputs into a flat list of image files.
///
/// Directories are scanned one level deep for files with a recognized
/// image extension; plain files are taken as-is.
fn collect_image_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let Ok(entries) = std::fs::read_dir(input) else {
                log::error!("cannot read directory {}", input.display());
                continue;
            };
            let mut found: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                })
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    paths
}

/// Decode a base64 PNG payload and write it next to the results.
fn write_overlay(out_dir: &Path, name: &str, payload: &str) {
    match BASE64.decode(payload) {
        Ok(bytes) => {
            let path = out_dir.join(name);
            if let Err(error) = std::fs::write(&path, bytes) {
                log::error!("cannot write overlay {}: {error}", path.display());
            }
        }
        Err(error) => log::error!("overlay payload for {name} is not valid base64: {error}"),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = config.validate() {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    let store = match cli.store_dir.as_ref().map(|dir| StateStore::open(dir)).transpose() {
        Ok(store) => store,
        Err(error) => {
            eprintln!("cannot open state store: {error}");
            return ExitCode::FAILURE;
        }
    };

    let paths = collect_image_paths(&cli.inputs);
    if paths.is_empty() {
        eprintln!("no image files found in the given inputs");
        return ExitCode::FAILURE;
    }

    // The batch loop: one image's failure never aborts the others.
    let mut images = Vec::new();
    for path in &paths {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => {
                log::error!("skipping {}: {error}", path.display());
                continue;
            }
        };

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();

        let image_id = match &store {
            Some(store) => match store.add_image(&cli.animal, &name, &bytes) {
                Ok(record) => record.image_id,
                Err(error) => {
                    log::error!("cannot register {name} in the store: {error}");
                    name.clone()
                }
            },
            None => name.clone(),
        };

        match alveo_pipeline::analyze(&bytes, &config) {
            Ok(metrics) => {
                log::info!(
                    "{name}: {} line rows, average MLI {:?}",
                    metrics.lines.len(),
                    metrics.average_mli_um,
                );
                images.push(AnalysisImageResult {
                    image_id,
                    image_number: u32::try_from(images.len() + 1).unwrap_or(u32::MAX),
                    name,
                    average_mli_um: metrics.average_mli_um,
                    processed_image_base64: metrics.processed_image_base64,
                    threshold_image_base64: metrics.threshold_image_base64,
                    lines: metrics.lines,
                });
            }
            Err(error) => log::error!("skipping {name}: {error}"),
        }
    }

    if images.is_empty() {
        eprintln!("all {} image(s) failed to analyze", paths.len());
        return ExitCode::FAILURE;
    }

    let result = AnalysisResult {
        animal_id: cli.animal.clone(),
        generated_at: unix_now(),
        images,
    };

    if let Some(store) = &store {
        if let Err(error) = store.record_analysis(result.clone()) {
            log::error!("cannot persist analysis result: {error}");
        }
    }

    if let Some(out_dir) = &cli.out_dir {
        if let Err(error) = std::fs::create_dir_all(out_dir) {
            eprintln!("cannot create output directory: {error}");
            return ExitCode::FAILURE;
        }
        for image in &result.images {
            let stem = Path::new(&image.name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("image");
            write_overlay(out_dir, &format!("{stem}_processed.png"), &image.processed_image_base64);
            write_overlay(out_dir, &format!("{stem}_threshold.png"), &image.threshold_image_base64);
        }
        match alveo_export::results_to_csv(std::slice::from_ref(&result)) {
            Ok(csv) => {
                let path = out_dir.join("results.csv");
                if let Err(error) = std::fs::write(&path, csv) {
                    eprintln!("cannot write {}: {error}", path.display());
                }
            }
            Err(error) => eprintln!("cannot serialize results: {error}"),
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                eprintln!("cannot serialize result to JSON: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_summary(&result);
    }

    ExitCode::SUCCESS
}

/// Human-readable per-image and per-line report.
fn print_summary(result: &AnalysisResult) {
    println!("Animal: {}", result.animal_id);
    for image in &result.images {
        match image.average_mli_um {
            Some(average) => {
                println!("  [{:>2}] {}: average MLI {average:.2} um", image.image_number, image.name);
            }
            None => println!("  [{:>2}] {}: average MLI undefined", image.image_number, image.name),
        }
        for line in &image.lines {
            let mli = line
                .mean_linear_intercept_um
                .map_or_else(|| "undefined".to_string(), |value| format!("{value:.2} um"));
            println!(
                "       line {:>2}: H {:>3}  V {:>3}  MLI {mli}",
                line.line_number, line.horizontal_intercepts, line.vertical_intercepts,
            );
        }
    }
}
