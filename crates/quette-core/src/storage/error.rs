//! Storage errors
//!
//! I/O failures are classified so callers can tell a full disk or a
//! permissions problem from anything else, and offer a hint to the user.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, writing or watching records
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create data directory '{path}': {source}")]
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

    /// No space left, or the store's quota is used up
    #[error("No space left while writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read record '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write record '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The finished temp file could not replace the record
    #[error("Could not move '{from}' over '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode records: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backend refused the write
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to watch for external changes: {0}")]
    Watch(#[from] notify::Error),
}

impl StorageError {
    /// Classify an I/O error hit while writing `path`
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match IoClass::of(&error) {
            IoClass::Permission => StorageError::PermissionDenied {
                path,
                source: error,
            },
            IoClass::NoSpace => StorageError::DiskFull {
                path,
                source: error,
            },
            IoClass::Other => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Whether retrying after user action can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::Unavailable(_)
        )
    }

    /// Hint to show next to the error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check the permissions of the data directory and its files.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Set data_dir to a location you can write to.")
            }
            StorageError::Unavailable(_) => {
                Some("Your changes are kept in memory; retry once the store is available.")
            }
            _ => None,
        }
    }
}

enum IoClass {
    Permission,
    NoSpace,
    Other,
}

impl IoClass {
    fn of(error: &io::Error) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            return IoClass::Permission;
        }
        // ErrorKind::StorageFull is not stable everywhere; match the message too
        let msg = error.to_string().to_lowercase();
        let no_space = ["no space left", "disk full", "quota exceeded", "not enough space"]
            .iter()
            .any(|needle| msg.contains(needle));
        if no_space {
            IoClass::NoSpace
        } else {
            IoClass::Other
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
