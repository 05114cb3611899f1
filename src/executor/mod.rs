//! Executor module for file operations

pub mod copy;
pub mod pool;
pub mod stats;

use crate::types::SkipReason;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub use copy::{copy_file_atomic, ensure_parent_dir};
pub use pool::TransferScheduler;
pub use stats::ResultAggregator;

/// Per-file events emitted while a run progresses.
///
/// Paths are relative to the synchronized roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Matched an exclude pattern
    SkipBlacklisted { path: PathBuf },
    /// Outside the inclusion set
    SkipNotIncluded { path: PathBuf },
    /// Destination already up to date
    SkipIdentical { path: PathBuf },
    /// File written (or, in a dry run, would have been)
    CopySuccess {
        path: PathBuf,
        bytes: u64,
        dry_run: bool,
    },
    /// File could not be transferred
    CopyFailure { path: PathBuf, error: String },
    /// Destination directory created on demand
    DirectoryCreated { path: PathBuf },
    /// Directory could not be read or created
    DirectoryError { path: PathBuf, error: String },
}

impl SyncEvent {
    /// Event for a skipped file
    pub fn skipped(reason: SkipReason, path: PathBuf) -> Self {
        match reason {
            SkipReason::Blacklisted => SyncEvent::SkipBlacklisted { path },
            SkipReason::NotIncluded => SyncEvent::SkipNotIncluded { path },
            SkipReason::Identical => SyncEvent::SkipIdentical { path },
        }
    }

    /// Relative path the event is about
    pub fn path(&self) -> &PathBuf {
        match self {
            SyncEvent::SkipBlacklisted { path }
            | SyncEvent::SkipNotIncluded { path }
            | SyncEvent::SkipIdentical { path }
            | SyncEvent::CopySuccess { path, .. }
            | SyncEvent::CopyFailure { path, .. }
            | SyncEvent::DirectoryCreated { path }
            | SyncEvent::DirectoryError { path, .. } => path,
        }
    }

    /// Write the event to the tracing subscriber
    pub fn log(&self) {
        match self {
            SyncEvent::SkipBlacklisted { path } => {
                debug!(path = %path.display(), "skip: blacklisted")
            }
            SyncEvent::SkipNotIncluded { path } => {
                debug!(path = %path.display(), "skip: not included")
            }
            SyncEvent::SkipIdentical { path } => {
                debug!(path = %path.display(), "skip: identical")
            }
            SyncEvent::CopySuccess {
                path,
                bytes,
                dry_run: true,
            } => info!(path = %path.display(), bytes, "would copy"),
            SyncEvent::CopySuccess { path, bytes, .. } => {
                info!(path = %path.display(), bytes, "copied")
            }
            SyncEvent::CopyFailure { path, error } => {
                warn!(path = %path.display(), %error, "copy failed")
            }
            SyncEvent::DirectoryCreated { path } => {
                debug!(path = %path.display(), "created directory")
            }
            SyncEvent::DirectoryError { path, error } => {
                warn!(path = %path.display(), %error, "directory error")
            }
        }
    }
}

/// Optional callback used to receive sync events.
pub type EventCallback = dyn Fn(&SyncEvent) + Send + Sync;

/// Log an event and hand it to the callback, if any
pub fn emit_event(on_event: Option<&EventCallback>, event: SyncEvent) {
    event.log();
    if let Some(callback) = on_event {
        callback(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_skipped_maps_reason() {
        let path = PathBuf::from("Mods/ConfigOverride/x.txt");
        assert_eq!(
            SyncEvent::skipped(SkipReason::Blacklisted, path.clone()),
            SyncEvent::SkipBlacklisted { path: path.clone() }
        );
        assert_eq!(
            SyncEvent::skipped(SkipReason::NotIncluded, path.clone()),
            SyncEvent::SkipNotIncluded { path: path.clone() }
        );
        assert_eq!(
            SyncEvent::skipped(SkipReason::Identical, path.clone()),
            SyncEvent::SkipIdentical { path }
        );
    }

    #[test]
    fn test_emit_event_reaches_callback() {
        let seen: Arc<Mutex<Vec<SyncEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_ref = Arc::clone(&seen);
        let callback = move |event: &SyncEvent| {
            seen_ref.lock().expect("lock events").push(event.clone());
        };

        emit_event(
            Some(&callback),
            SyncEvent::CopySuccess {
                path: PathBuf::from("Saves/slot1.save"),
                bytes: 12,
                dry_run: false,
            },
        );
        emit_event(None, SyncEvent::SkipIdentical {
            path: PathBuf::from("ignored"),
        });

        let events = seen.lock().expect("lock events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path(), &PathBuf::from("Saves/slot1.save"));
    }
}
