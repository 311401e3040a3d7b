//! Error types for watcher-core operations.

use std::io;
use std::path::{Path, PathBuf};

/// All errors that can occur in watcher-core operations.
///
/// Component operations return these; the orchestrator in [`crate::engine`]
/// is the boundary that logs them and keeps the host tick alive.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    // ─────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("JSON parsing error: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid widget configuration: {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Missing Files
    // ─────────────────────────────────────────────────────────────────────
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Backup missing: {0}")]
    BackupMissing(PathBuf),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Permission denied: {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Detection Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Process enumeration failed: {0}")]
    ProcessEnumeration(String),
}

impl WatcherError {
    /// Classifies an I/O error raised while touching `path`.
    pub fn from_io(path: &Path, context: impl Into<String>, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => WatcherError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => WatcherError::PermissionDenied {
                path: path.to_path_buf(),
                source,
            },
            _ => WatcherError::Io {
                context: context.into(),
                source,
            },
        }
    }

    /// True for errors that mean "the file simply isn't there".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WatcherError::NotFound(_) | WatcherError::BackupMissing(_)
        )
    }
}

/// Convenience type alias for Results using WatcherError.
pub type Result<T> = std::result::Result<T, WatcherError>;
