//! # simsync - Game user-data synchronization
//!
//! Copies a game's user-data folder to another location, transferring only
//! new or changed files and leaving machine-specific files behind.
//!
//! The pipeline: a [`TreeWalker`](scanner::TreeWalker) yields batches of
//! files, a [`PathFilter`] classifies them, a
//! [`ChangeDetector`](diff::ChangeDetector) decides what to copy, a
//! [`TransferScheduler`](executor::TransferScheduler) runs the copies on a
//! bounded pool and a [`StructureVerifier`](verify::StructureVerifier)
//! checks the result.

// Module declarations
pub mod config;
pub mod filter;
pub mod scanner;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod verify;
pub mod ui;
pub mod commands;
pub mod types;

// Re-export commonly used types
pub use types::{FileEntry, RunStatistics, SkipReason, SyncError, TransferDecision};
pub use config::Config;
pub use filter::PathFilter;
pub use commands::sync::{run, SyncReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
