//! JSON-backed state store for animals, uploaded images, and
//! analysis results.
//!
//! State lives in a single `state.json` under the store's base
//! directory; uploaded image bytes are copied into
//! `uploads/<animal_id>/`. Every mutation persists immediately, so a
//! process restart loses nothing. A `Mutex` serializes mutations; the
//! store never blocks on anything but its own lock and the filesystem.
//!
//! The analytical core never sees this type -- it is consulted only
//! for path resolution before an analysis and for persisting the
//! returned aggregates afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::records::{AnalysisResult, AnimalRecord, ImageRecord};

/// Errors from the state store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `state.json` could not be parsed or serialized.
    #[error("storage state error: {0}")]
    Json(#[from] serde_json::Error),

    /// No image record with the given id exists.
    #[error("unknown image id: {0}")]
    UnknownImage(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    animals: BTreeMap<String, AnimalRecord>,
    images: BTreeMap<String, ImageRecord>,
    results: BTreeMap<String, AnalysisResult>,
}

/// Persistent store rooted at a base directory.
#[derive(Debug)]
pub struct StateStore {
    base_dir: PathBuf,
    state_path: PathBuf,
    state: Mutex<State>,
}

impl StateStore {
    /// Open (or initialize) a store under `base_dir`.
    ///
    /// The directory is created if missing. An existing `state.json`
    /// is loaded; otherwise the store starts empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created
    /// or the state file cannot be read, and [`StoreError::Json`] if
    /// an existing state file is corrupt.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let state_path = base_dir.join("state.json");

        let state = if state_path.exists() {
            let contents = fs::read_to_string(&state_path)?;
            serde_json::from_str(&contents)?
        } else {
            State::default()
        };

        Ok(Self {
            base_dir,
            state_path,
            state: Mutex::new(state),
        })
    }

    /// The store's base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &State) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.state_path, json)?;
        Ok(())
    }

    /// Look up an animal record, creating it on first reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] / [`StoreError::Json`] if persisting
    /// a newly created record fails.
    pub fn ensure_animal(&self, animal_id: &str) -> Result<AnimalRecord, StoreError> {
        let mut state = self.lock();
        if let Some(record) = state.animals.get(animal_id) {
            return Ok(record.clone());
        }
        let record = AnimalRecord {
            animal_id: animal_id.to_string(),
            created_at: unix_now(),
        };
        state.animals.insert(animal_id.to_string(), record.clone());
        self.persist(&state)?;
        log::info!("created animal record {animal_id}");
        Ok(record)
    }

    /// Store an uploaded image for an animal.
    ///
    /// The bytes are written to `uploads/<animal_id>/<id>-<filename>`
    /// and a record with a SipHash-derived id is persisted. The animal
    /// record is created if this is its first image.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the upload file or the state
    /// cannot be written.
    pub fn add_image(
        &self,
        animal_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ImageRecord, StoreError> {
        self.ensure_animal(animal_id)?;

        let uploaded_at = unix_now();
        let image_id = image_id_for(animal_id, filename, bytes);
        let safe_name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload");

        let animal_dir = self.base_dir.join("uploads").join(animal_id);
        fs::create_dir_all(&animal_dir)?;
        let stored_path = animal_dir.join(format!("{image_id}-{safe_name}"));
        fs::write(&stored_path, bytes)?;

        let record = ImageRecord {
            image_id: image_id.clone(),
            animal_id: animal_id.to_string(),
            original_filename: filename.to_string(),
            stored_path: stored_path.to_string_lossy().into_owned(),
            size: bytes.len() as u64,
            uploaded_at,
        };

        let mut state = self.lock();
        state.images.insert(image_id.clone(), record.clone());
        self.persist(&state)?;
        log::info!("stored image {image_id} for animal {animal_id} ({} bytes)", bytes.len());
        Ok(record)
    }

    /// Fetch a single image record by id.
    #[must_use]
    pub fn image(&self, image_id: &str) -> Option<ImageRecord> {
        self.lock().images.get(image_id).cloned()
    }

    /// All image records for an animal, ordered by upload time.
    #[must_use]
    pub fn images_for_animal(&self, animal_id: &str) -> Vec<ImageRecord> {
        let state = self.lock();
        let mut records: Vec<ImageRecord> = state
            .images
            .values()
            .filter(|record| record.animal_id == animal_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.uploaded_at);
        records
    }

    /// Delete an image record and its stored file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownImage`] if no such record exists,
    /// or [`StoreError::Io`] if the state cannot be persisted. A
    /// missing file on disk is tolerated.
    pub fn remove_image(&self, image_id: &str) -> Result<ImageRecord, StoreError> {
        let mut state = self.lock();
        let record = state
            .images
            .remove(image_id)
            .ok_or_else(|| StoreError::UnknownImage(image_id.to_string()))?;
        self.persist(&state)?;
        drop(state);

        if let Err(error) = fs::remove_file(&record.stored_path) {
            log::warn!("could not delete stored file {}: {error}", record.stored_path);
        }
        log::info!("removed image {image_id}");
        Ok(record)
    }

    /// Reassign an image to another animal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownImage`] if no such record exists.
    pub fn move_image(&self, image_id: &str, to_animal_id: &str) -> Result<ImageRecord, StoreError> {
        self.ensure_animal(to_animal_id)?;
        let mut state = self.lock();
        let record = state
            .images
            .get_mut(image_id)
            .ok_or_else(|| StoreError::UnknownImage(image_id.to_string()))?;
        record.animal_id = to_animal_id.to_string();
        let updated = record.clone();
        self.persist(&state)?;
        Ok(updated)
    }

    /// Persist an analysis run, replacing any previous result for the
    /// same animal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] / [`StoreError::Json`] if the state
    /// cannot be persisted.
    pub fn record_analysis(&self, result: AnalysisResult) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.results.insert(result.animal_id.clone(), result);
        self.persist(&state)
    }

    /// All persisted analysis results, ordered by animal id.
    #[must_use]
    pub fn results(&self) -> Vec<AnalysisResult> {
        self.lock().results.values().cloned().collect()
    }

    /// The persisted result for one animal, if any.
    #[must_use]
    pub fn result_for_animal(&self, animal_id: &str) -> Option<AnalysisResult> {
        self.lock().results.get(animal_id).cloned()
    }

    /// Drop all persisted analysis results (records and uploads stay).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] / [`StoreError::Json`] if the state
    /// cannot be persisted.
    pub fn clear_results(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.results.clear();
        self.persist(&state)
    }
}

/// Current time as Unix epoch seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

/// Derive a stable hex id for an upload from its animal, filename,
/// content, and the upload instant (nanosecond resolution, so two
/// identical uploads still get distinct ids).
fn image_id_for(animal_id: &str, filename: &str, bytes: &[u8]) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);

    let mut hasher = SipHasher13::new();
    hasher.write(animal_id.as_bytes());
    hasher.write(filename.as_bytes());
    hasher.write(bytes);
    hasher.write_u128(nanos);
    format!("{:016x}", hasher.finish())
}
