use crate::storage::note::Note;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const NOTES_FILE: &str = "notes.json";

/// A write failure never aborts the session; the store keeps running in
/// memory and the UI warns once.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// One named slot holding the whole JSON-serialized collection. Read once at
/// startup, overwritten after every mutation.
pub struct StorageSlot {
    path: PathBuf,
}

impl StorageSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        StorageSlot {
            path: dir.into().join(NOTES_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored collection. A missing or unreadable file and a file
    /// that no longer parses both read as "no notes yet".
    pub fn load(&self) -> Vec<Note> {
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    pub fn save(&self, notes: &[Note]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(notes)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        fs::write(&self.path, json).map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}
