//! Core type definitions for simsync

mod action;
mod entry;
mod error;
mod stats;

pub use action::{PendingJob, SkipReason, TransferDecision, TransferOutcome};
pub use entry::FileEntry;
pub use error::{SyncError, WalkError};
pub use stats::{FileError, RunStatistics};
