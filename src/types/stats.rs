//! RunStatistics - Counters reported at the end of a run

use serde::Serialize;

/// Point-in-time copy of the run counters.
///
/// `processed == skipped + copied + errored` once the scheduler has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub processed: u64,
    pub skipped: u64,
    pub copied: u64,
    pub errored: u64,

    /// Breakdown of `skipped`
    pub skipped_blacklisted: u64,
    pub skipped_not_included: u64,
    pub skipped_identical: u64,

    pub bytes_copied: u64,
}

impl RunStatistics {
    /// True when no file failed
    pub fn is_clean(&self) -> bool {
        self.errored == 0
    }
}

/// A failed file and the reason, kept for the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: std::path::PathBuf,
    pub message: String,
}
