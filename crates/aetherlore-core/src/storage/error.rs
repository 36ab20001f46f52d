//! Storage errors
//!
//! I/O failures are classified so the CLI can print a hint next to the
//! message. A corrupt record is not fatal: the store keeps the error around
//! after falling back to defaults so front-ends can report it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied for '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left while writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record was copied to `backup_path` and replaced by defaults
    #[error("Record '{path}' could not be read ({details}); saved a copy to '{backup_path}'")]
    CorruptRecord {
        path: PathBuf,
        backup_path: PathBuf,
        details: String,
    },

    /// The temp file was written but could not replace the record
    #[error("Could not move '{from}' over '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify an I/O error on `path`
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied {
                path,
                source: error,
            }
        } else if is_disk_full(&error) {
            StorageError::DiskFull {
                path,
                source: error,
            }
        } else {
            StorageError::Io {
                path,
                source: error,
            }
        }
    }

    /// What the user can do about it, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::CreateDirectory { .. } => {
                Some("Check that data_dir points somewhere writable (aetherlore config set data_dir <path>).")
            }
            StorageError::PermissionDenied { .. } => {
                Some("Check ownership and permissions of the data directory.")
            }
            StorageError::DiskFull { .. } => Some("Free up disk space and run the command again."),
            StorageError::CorruptRecord { .. } => {
                Some("Your next change overwrites the record. To restore, import an earlier export with `aetherlore book import <file>`.")
            }
            StorageError::Io { .. } | StorageError::AtomicWriteFailed { .. } => None,
        }
    }
}

fn is_disk_full(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left") || msg.contains("quota exceeded") || msg.contains("disk full")
}

pub type StorageResult<T> = Result<T, StorageError>;
