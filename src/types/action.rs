//! Per-file decisions, queued jobs and their outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a file was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Matched an exclude pattern
    Blacklisted,

    /// Outside the configured inclusion set
    NotIncluded,

    /// Destination already holds the same content
    Identical,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Blacklisted => "blacklisted",
            SkipReason::NotIncluded => "not included",
            SkipReason::Identical => "identical",
        };
        f.write_str(label)
    }
}

/// Decision made for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDecision {
    /// Leave the destination untouched
    Skip(SkipReason),

    /// Copy the whole file to the destination
    Copy,
}

/// Copy job handed from the traversal loop to exactly one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    /// Source file to read
    pub source: PathBuf,

    /// Destination file to (re)write
    pub destination: PathBuf,

    /// Path relative to the roots, used for reporting
    pub relative: PathBuf,

    /// Replace read-only destination files
    pub overwrite: bool,
}

/// Terminal result of one copy attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub path: PathBuf,
    pub success: bool,
    pub error: Option<String>,
    pub bytes: u64,
}

impl TransferOutcome {
    pub fn success(path: PathBuf, bytes: u64) -> Self {
        Self {
            path,
            success: true,
            error: None,
            bytes,
        }
    }

    pub fn failure(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            path,
            success: false,
            error: Some(error.into()),
            bytes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        let ok = TransferOutcome::success(PathBuf::from("Saves/a.save"), 42);
        assert!(ok.success);
        assert_eq!(ok.bytes, 42);
        assert!(ok.error.is_none());

        let failed = TransferOutcome::failure(PathBuf::from("Saves/b.save"), "boom");
        assert!(!failed.success);
        assert_eq!(failed.bytes, 0);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::NotIncluded.to_string(), "not included");
        assert_eq!(
            serde_json::to_string(&SkipReason::NotIncluded).expect("serialize"),
            "\"not-included\""
        );
    }
}
