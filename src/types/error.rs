//! Error types for simsync

use std::path::PathBuf;
use thiserror::Error;

/// Error types for simsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source root does not exist or is not a directory
    #[error("Source directory does not exist: {path}")]
    SourceMissing { path: PathBuf },

    /// Destination root could not be created
    #[error("Cannot create destination directory {path}: {source}")]
    DestinationUncreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Permission denied for specific path
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Glob pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// File content could not be read for hashing
    #[error("Failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Traversal failure below a root
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// Worker pool failure
    #[error("Transfer scheduler error: {0}")]
    Scheduler(String),
}

impl SyncError {
    /// Errors that abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::SourceMissing { .. }
                | SyncError::DestinationUncreatable { .. }
                | SyncError::Config(_)
                | SyncError::Pattern { .. }
                | SyncError::Scheduler(_)
        )
    }
}

/// Failures reported by the tree walker. None of them stop the walk.
#[derive(Debug, Error)]
pub enum WalkError {
    /// A directory could not be listed; its subtree is skipped
    #[error("Cannot read directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single entry could not be inspected
    #[error("Cannot read metadata for {path}: {source}")]
    Entry {
        path: PathBuf,
        relative: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WalkError {
    /// Path of the directory or entry that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            WalkError::Directory { path, .. } | WalkError::Entry { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_automatic_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let err: SyncError = io_error.into();

        assert!(matches!(err, SyncError::Io(_)));
        assert!(err.to_string().contains("IO error"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_source_missing_is_fatal() {
        let err = SyncError::SourceMissing {
            path: PathBuf::from("/missing/src"),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/missing/src"));
    }

    #[test]
    fn test_destination_uncreatable_is_fatal() {
        let err = SyncError::DestinationUncreatable {
            path: PathBuf::from("/ro/dest"),
            source: IoError::new(ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/ro/dest"));
    }

    #[test]
    fn test_walk_error_is_not_fatal() {
        let err: SyncError = WalkError::Directory {
            path: PathBuf::from("Mods/locked"),
            source: IoError::new(ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("Mods/locked"));
    }
}
