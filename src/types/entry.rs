//! FileEntry - A single file seen during traversal

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Represents a file found under one of the walked roots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute (or root-joined) path used for I/O
    pub path: PathBuf,

    /// Path relative to the root it was found under
    pub relative: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub mtime: SystemTime,
}

impl FileEntry {
    /// Create a new FileEntry with the given parameters
    pub fn new(path: PathBuf, relative: PathBuf, size: u64, mtime: SystemTime) -> Self {
        Self {
            path,
            relative,
            size,
            mtime,
        }
    }

    /// Build an entry from already-fetched metadata.
    ///
    /// Filesystems that cannot report a modification time get `UNIX_EPOCH`,
    /// which forces the hash tier whenever sizes line up.
    pub fn from_metadata(path: &Path, relative: &Path, metadata: &Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            relative: relative.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().unwrap_or(UNIX_EPOCH),
        }
    }

    /// Same size and same modification time
    pub fn metadata_matches(&self, other: &FileEntry) -> bool {
        self.size == other.size && self.mtime == other.mtime
    }
}
