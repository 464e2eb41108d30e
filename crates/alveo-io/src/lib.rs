//! alveo-io: record storage for alveo.
//!
//! Owns everything the analytical core deliberately does not: animal
//! and image records, upload file placement, and persistence of
//! completed analysis results. The core (`alveo-pipeline`) stays
//! sans-IO; callers run the pipeline and hand the aggregates to
//! [`StateStore::record_analysis`].

pub mod records;
pub mod store;

pub use records::{AnalysisImageResult, AnalysisResult, AnimalRecord, ImageRecord};
pub use store::{StateStore, StoreError};
