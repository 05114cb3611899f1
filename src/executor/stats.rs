//! Thread-safe run counters

use crate::types::{FileError, RunStatistics, SkipReason, TransferOutcome};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Collects per-file results from the traversal loop and every worker.
///
/// Each record bumps `processed` and exactly one of `skipped`, `copied` or
/// `errored`, so the identity `processed == skipped + copied + errored`
/// holds at every quiescent point.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    processed: AtomicU64,
    skipped: AtomicU64,
    copied: AtomicU64,
    errored: AtomicU64,
    skipped_blacklisted: AtomicU64,
    skipped_not_included: AtomicU64,
    skipped_identical: AtomicU64,
    bytes_copied: AtomicU64,
    errors: Mutex<Vec<FileError>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&self, reason: SkipReason) {
        let bucket = match reason {
            SkipReason::Blacklisted => &self.skipped_blacklisted,
            SkipReason::NotIncluded => &self.skipped_not_included,
            SkipReason::Identical => &self.skipped_identical,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copy_success(&self, bytes: u64) {
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
        self.copied.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copy_failure(&self, path: PathBuf, message: impl Into<String>) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FileError {
                path,
                message: message.into(),
            });
        self.errored.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the terminal result of a copy job
    pub fn record_outcome(&self, outcome: &TransferOutcome) {
        if outcome.success {
            self.record_copy_success(outcome.bytes);
        } else {
            let message = outcome
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            self.record_copy_failure(outcome.path.clone(), message);
        }
    }

    /// Current counter values
    pub fn snapshot(&self) -> RunStatistics {
        RunStatistics {
            processed: self.processed.load(Ordering::Acquire),
            skipped: self.skipped.load(Ordering::Acquire),
            copied: self.copied.load(Ordering::Acquire),
            errored: self.errored.load(Ordering::Acquire),
            skipped_blacklisted: self.skipped_blacklisted.load(Ordering::Acquire),
            skipped_not_included: self.skipped_not_included.load(Ordering::Acquire),
            skipped_identical: self.skipped_identical.load(Ordering::Acquire),
            bytes_copied: self.bytes_copied.load(Ordering::Acquire),
        }
    }

    /// Failed files in the order they were recorded
    pub fn errors(&self) -> Vec<FileError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_partition_processed() {
        let agg = ResultAggregator::new();
        agg.record_skip(SkipReason::Blacklisted);
        agg.record_skip(SkipReason::NotIncluded);
        agg.record_skip(SkipReason::Identical);
        agg.record_copy_success(100);
        agg.record_copy_failure(PathBuf::from("Saves/bad.save"), "denied");

        let stats = agg.snapshot();
        assert_eq!(stats.processed, 5);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.errored, 1);
        assert_eq!(stats.skipped_blacklisted, 1);
        assert_eq!(stats.skipped_not_included, 1);
        assert_eq!(stats.skipped_identical, 1);
        assert_eq!(stats.bytes_copied, 100);
        assert!(!stats.is_clean());

        let errors = agg.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, PathBuf::from("Saves/bad.save"));
        assert_eq!(errors[0].message, "denied");
    }

    #[test]
    fn test_record_outcome() {
        let agg = ResultAggregator::new();
        agg.record_outcome(&TransferOutcome::success(PathBuf::from("a"), 7));
        agg.record_outcome(&TransferOutcome::failure(PathBuf::from("b"), "boom"));

        let stats = agg.snapshot();
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.errored, 1);
        assert_eq!(stats.bytes_copied, 7);
    }

    #[test]
    fn test_concurrent_records() {
        let agg = Arc::new(ResultAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    for j in 0..250 {
                        match (i + j) % 3 {
                            0 => agg.record_skip(SkipReason::Identical),
                            1 => agg.record_copy_success(1),
                            _ => agg.record_copy_failure(PathBuf::from(format!("{i}/{j}")), "x"),
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let stats = agg.snapshot();
        assert_eq!(stats.processed, 2_000);
        assert_eq!(stats.processed, stats.skipped + stats.copied + stats.errored);
        assert_eq!(agg.errors().len() as u64, stats.errored);
    }
}
