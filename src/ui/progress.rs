//! Progress reporting

use crate::executor::SyncEvent;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Spinner fed by the sync event stream.
///
/// Events arrive from the traversal thread and from every copy worker, so
/// all state lives in atomics and the reporter is shared by reference.
/// indicatif hides the bar when stderr is not a terminal.
pub struct ProgressReporter {
    bar: ProgressBar,
    started_at: Instant,
    seen: AtomicU64,
    copied: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
}

impl ProgressReporter {
    /// Create a new progress reporter drawing to stderr
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.set_message("Scanning...");
        Self::with_bar(bar)
    }

    /// Reporter that counts but never draws
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            started_at: Instant::now(),
            seen: AtomicU64::new(0),
            copied: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Update counters and the status line for one event
    pub fn handle_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::SkipBlacklisted { .. }
            | SyncEvent::SkipNotIncluded { .. }
            | SyncEvent::SkipIdentical { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            SyncEvent::CopySuccess { bytes, .. } => {
                self.copied.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(*bytes, Ordering::Relaxed);
            }
            SyncEvent::CopyFailure { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            SyncEvent::DirectoryCreated { .. } | SyncEvent::DirectoryError { .. } => return,
        }

        self.seen.fetch_add(1, Ordering::Relaxed);
        self.bar.set_message(format!(
            "{} files | {} copied, {} skipped, {} failed | {} | {}/s | {}",
            self.seen.load(Ordering::Relaxed),
            self.copied.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            HumanBytes(self.bytes.load(Ordering::Relaxed)),
            HumanBytes(self.current_throughput_bps()),
            event.path().display()
        ));
    }

    /// Stop the spinner and remove it from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn current_throughput_bps(&self) -> u64 {
        let secs = self.started_at.elapsed().as_secs_f64();
        if secs > 0.0 {
            (self.bytes.load(Ordering::Relaxed) as f64 / secs) as u64
        } else {
            0
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
