//! Durable storage for draft records.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::error::StorageError;

use super::record::{DraftKey, DraftRecord};

/// Key-value storage of serialized drafts.
///
/// Backends only move records in and out; revision checks and failure
/// handling live in [`DraftStore`](super::DraftStore).
pub trait DraftBackend: Send {
    /// Load the stored record for `key`, `None` if nothing is stored.
    fn load(&self, key: &DraftKey) -> Result<Option<DraftRecord>, StorageError>;

    /// Replace the stored record for `key`.
    fn store(&self, key: &DraftKey, record: &DraftRecord) -> Result<(), StorageError>;

    /// Delete the stored record for `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &DraftKey) -> Result<(), StorageError>;
}

impl<B: DraftBackend + Sync + ?Sized> DraftBackend for Arc<B> {
    fn load(&self, key: &DraftKey) -> Result<Option<DraftRecord>, StorageError> {
        (**self).load(key)
    }

    fn store(&self, key: &DraftKey, record: &DraftRecord) -> Result<(), StorageError> {
        (**self).store(key, record)
    }

    fn remove(&self, key: &DraftKey) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// One JSON file per draft key inside a directory.
///
/// ```text
/// drafts/
/// ├── code-generator-1f2e….json
/// └── manual-note-9a0b….json
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a drafts directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &DraftKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }
}

impl DraftBackend for FileBackend {
    fn load(&self, key: &DraftKey) -> Result<Option<DraftRecord>, StorageError> {
        let path = self.path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        let record = serde_json::from_slice(&bytes)?;
        Ok(Some(record))
    }

    fn store(&self, key: &DraftKey, record: &DraftRecord) -> Result<(), StorageError> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;

        // Write-then-rename so a crash never leaves a half-written draft.
        fs::write(&tmp, bytes).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }

    fn remove(&self, key: &DraftKey) -> Result<(), StorageError> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}

/// Process-local backend. Survives store instances, not process restarts.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<FxHashMap<DraftKey, DraftRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FxHashMap<DraftKey, DraftRecord>>, StorageError> {
        self.records
            .lock()
            .map_err(|_| StorageError::Unavailable("memory backend lock poisoned".to_string()))
    }
}

impl DraftBackend for MemoryBackend {
    fn load(&self, key: &DraftKey) -> Result<Option<DraftRecord>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn store(&self, key: &DraftKey, record: &DraftRecord) -> Result<(), StorageError> {
        self.lock()?.insert(key.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, key: &DraftKey) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
