//! Keyed record persistence
//!
//! Each record is a JSON document stored as `<key>.json` in the data
//! directory. Writes are atomic (write to temp file, then rename) so a crash
//! never leaves a half-written record behind.
//!
//! Records:
//! - `aetherlore_book_v2.json` - the lorebook
//! - `aetherlore_settings_v2.json` - application settings

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::storage::error::{StorageError, StorageResult};

/// Record key for the lorebook
pub const BOOK_RECORD: &str = "aetherlore_book_v2";

/// Record key for the application settings
pub const SETTINGS_RECORD: &str = "aetherlore_settings_v2";

/// Sizes of the stored records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub book_exists: bool,
    pub settings_exists: bool,
    pub book_size: u64,
    pub settings_size: u64,
}

impl StorageStats {
    pub fn total_size(&self) -> u64 {
        self.book_size + self.settings_size
    }

    /// Total size formatted for humans (e.g. "12.3 KB")
    pub fn total_size_human(&self) -> String {
        let size = self.total_size();
        if size < 1024 {
            format!("{} B", size)
        } else if size < 1024 * 1024 {
            format!("{:.1} KB", size as f64 / 1024.0)
        } else {
            format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Persistence layer for keyed JSON records
pub struct RecordPersistence {
    dir: PathBuf,
}

impl RecordPersistence {
    /// Create a persistence handler rooted at the configured data directory
    pub fn new(config: &Config) -> Self {
        Self::in_dir(config.data_dir.clone())
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing a record
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Check if a record exists on disk
    pub fn exists(&self, key: &str) -> bool {
        self.record_path(key).exists()
    }

    /// Read a record's raw bytes
    ///
    /// Returns `None` if the record has never been written.
    pub fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.record_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_io(e, path)),
        }
    }

    /// Replace a record atomically
    pub fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.record_path(key);
        atomic_write(&path, bytes)?;
        debug!(record = key, bytes = bytes.len(), "Wrote record");
        Ok(())
    }

    /// Set an unreadable record aside as `<key>.json.corrupt`
    ///
    /// Returns the error describing what happened, including the backup path,
    /// so callers can log it and carry on with defaults.
    pub fn quarantine(&self, key: &str, details: impl Into<String>) -> StorageResult<StorageError> {
        let path = self.record_path(key);
        let backup_path = path.with_extension("json.corrupt");
        fs::copy(&path, &backup_path).map_err(|e| StorageError::from_io(e, backup_path.clone()))?;

        Ok(StorageError::CorruptRecord {
            path,
            backup_path,
            details: details.into(),
        })
    }

    /// Sizes of the stored records
    pub fn stats(&self) -> StorageStats {
        let size_of = |key: &str| fs::metadata(self.record_path(key)).map(|m| m.len()).ok();
        let book = size_of(BOOK_RECORD);
        let settings = size_of(SETTINGS_RECORD);

        StorageStats {
            book_exists: book.is_some(),
            settings_exists: settings.is_some(),
            book_size: book.unwrap_or(0),
            settings_size: settings.unwrap_or(0),
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
