//! Main sync command

use crate::diff::ChangeDetector;
use crate::executor::{emit_event, EventCallback, ResultAggregator, SyncEvent, TransferScheduler};
use crate::filter::PathFilter;
use crate::scanner::{resolve_batch_size, TreeWalker};
use crate::types::{
    FileEntry, FileError, PendingJob, RunStatistics, SkipReason, SyncError, TransferDecision,
    WalkError,
};
use crate::verify::{StructureVerifier, VerificationReport};
use crate::Config;
use indicatif::HumanBytes;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Number of failed files listed in the human summary
const SUMMARY_ERROR_PREVIEW: usize = 10;

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub stats: RunStatistics,
    pub errors: Vec<FileError>,
    /// `None` when verification was disabled or the run was a dry run
    pub verification: Option<VerificationReport>,
    pub dry_run: bool,
    pub elapsed: Duration,
}

impl SyncReport {
    /// No per-file errors and no structural differences
    pub fn is_clean(&self) -> bool {
        self.stats.is_clean()
            && self
                .verification
                .as_ref()
                .map_or(true, VerificationReport::is_clean)
    }
}

/// Run the sync operation
///
/// Fails only on preconditions (missing source, uncreatable destination,
/// bad patterns, worker pool failure). Per-file and per-directory problems
/// are counted in the returned report.
pub fn run(config: &Config, on_event: Option<Arc<EventCallback>>) -> Result<SyncReport, SyncError> {
    let started = Instant::now();

    if !config.source.is_dir() {
        return Err(SyncError::SourceMissing {
            path: config.source.clone(),
        });
    }

    let filter = PathFilter::from_config(config)?;

    if !config.dry_run {
        fs::create_dir_all(&config.destination).map_err(|source| {
            SyncError::DestinationUncreatable {
                path: config.destination.clone(),
                source,
            }
        })?;
    }

    let batch_size = resolve_batch_size(config, &config.source);
    info!(
        source = %config.source.display(),
        destination = %config.destination.display(),
        jobs = config.max_parallel_jobs,
        batch_size,
        dry_run = config.dry_run,
        "starting sync"
    );

    let aggregator = Arc::new(ResultAggregator::new());
    let scheduler = TransferScheduler::new(config.max_parallel_jobs, Arc::clone(&aggregator))?
        .dry_run(config.dry_run)
        .on_event(on_event.clone());

    let pipeline = Pipeline {
        config,
        filter: &filter,
        detector: ChangeDetector::new(config.compare_mode),
        aggregator: &aggregator,
        scheduler: &scheduler,
        on_event: on_event.as_deref(),
    };

    let walker = TreeWalker::new(&config.source)
        .batch_size(batch_size)
        .symlinks(config.symlink_policy);

    for batch in walker {
        match batch {
            Ok(entries) => {
                for entry in entries {
                    pipeline.process(entry)?;
                }
            }
            Err(err) => pipeline.walk_failed(err),
        }
    }

    let stats = scheduler.finish()?;

    let verification = if config.verify && !config.dry_run {
        Some(
            StructureVerifier::new(&filter)
                .symlinks(config.symlink_policy)
                .verify(&config.source, &config.destination),
        )
    } else {
        None
    };

    let report = SyncReport {
        stats,
        errors: aggregator.errors(),
        verification,
        dry_run: config.dry_run,
        elapsed: started.elapsed(),
    };

    info!(
        processed = report.stats.processed,
        copied = report.stats.copied,
        skipped = report.stats.skipped,
        errored = report.stats.errored,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "sync finished"
    );

    Ok(report)
}

/// Per-file classification, shared by every batch of one run
struct Pipeline<'a> {
    config: &'a Config,
    filter: &'a PathFilter,
    detector: ChangeDetector,
    aggregator: &'a ResultAggregator,
    scheduler: &'a TransferScheduler,
    on_event: Option<&'a EventCallback>,
}

impl Pipeline<'_> {
    fn process(&self, entry: FileEntry) -> Result<(), SyncError> {
        if let Some(reason) = self.filter.classify(&entry.relative) {
            self.skip(reason, entry.relative);
            return Ok(());
        }

        let destination = self.config.destination.join(&entry.relative);
        let existing = match stat_destination(&destination, &entry.relative) {
            Ok(existing) => existing,
            Err(e) => {
                self.fail(entry.relative, format!("cannot stat destination: {}", e));
                return Ok(());
            }
        };

        match self.detector.decide(&entry, existing.as_ref()) {
            Ok(TransferDecision::Skip(reason)) => self.skip(reason, entry.relative),
            Ok(TransferDecision::Copy) => {
                debug!(path = %entry.relative.display(), "queued for copy");
                self.scheduler.submit(PendingJob {
                    source: entry.path,
                    destination,
                    relative: entry.relative,
                    overwrite: self.config.force,
                })?;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => self.fail(entry.relative, e.to_string()),
        }

        Ok(())
    }

    fn walk_failed(&self, err: WalkError) {
        match err {
            WalkError::Directory { path, source } => {
                let relative = path
                    .strip_prefix(&self.config.source)
                    .map(Path::to_path_buf)
                    .unwrap_or(path);
                emit_event(
                    self.on_event,
                    SyncEvent::DirectoryError {
                        path: relative,
                        error: source.to_string(),
                    },
                );
            }
            WalkError::Entry {
                relative, source, ..
            } => match self.filter.classify(&relative) {
                Some(reason) => self.skip(reason, relative),
                None => self.fail(relative, format!("cannot read metadata: {}", source)),
            },
        }
    }

    fn skip(&self, reason: SkipReason, relative: PathBuf) {
        self.aggregator.record_skip(reason);
        emit_event(self.on_event, SyncEvent::skipped(reason, relative));
    }

    fn fail(&self, relative: PathBuf, message: String) {
        self.aggregator
            .record_copy_failure(relative.clone(), message.clone());
        emit_event(
            self.on_event,
            SyncEvent::CopyFailure {
                path: relative,
                error: message,
            },
        );
    }
}

/// Destination entry at `path`, or `None` when nothing is there yet.
///
/// A directory in place of the file also yields `None`; the copy then
/// fails and is reported like any other per-file error.
fn stat_destination(path: &Path, relative: &Path) -> std::io::Result<Option<FileEntry>> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => {
            Ok(Some(FileEntry::from_metadata(path, relative, &metadata)))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Human-readable end-of-run summary
pub fn format_summary(report: &SyncReport) -> String {
    let stats = &report.stats;
    let mut lines = Vec::new();

    lines.push(if report.dry_run {
        "Dry run complete (no changes were made):".to_string()
    } else {
        "Sync complete:".to_string()
    });
    lines.push(format!(
        "  Processed: {}  {}: {}  Skipped: {}  Errors: {}",
        stats.processed,
        if report.dry_run { "Would copy" } else { "Copied" },
        stats.copied,
        stats.skipped,
        stats.errored
    ));
    lines.push(format!(
        "  Skipped: {} excluded, {} not included, {} unchanged",
        stats.skipped_blacklisted, stats.skipped_not_included, stats.skipped_identical
    ));
    lines.push(format!(
        "  Transferred: {} in {:.1}s",
        HumanBytes(stats.bytes_copied),
        report.elapsed.as_secs_f64()
    ));

    if !report.errors.is_empty() {
        lines.push(format!("Failed files ({}):", report.errors.len()));
        for error in report.errors.iter().take(SUMMARY_ERROR_PREVIEW) {
            lines.push(format!("  - {}: {}", error.path.display(), error.message));
        }
        if report.errors.len() > SUMMARY_ERROR_PREVIEW {
            lines.push(format!(
                "  - ... {} more",
                report.errors.len() - SUMMARY_ERROR_PREVIEW
            ));
        }
    }

    if let Some(verification) = &report.verification {
        if verification.is_clean() {
            lines.push("Verification: destination matches source".to_string());
        } else {
            lines.push(format!(
                "Verification: {} missing, {} extra",
                verification.missing.len(),
                verification.extra.len()
            ));
            for path in verification.missing.iter().take(SUMMARY_ERROR_PREVIEW) {
                lines.push(format!("  missing {}", path.display()));
            }
            for path in verification.extra.iter().take(SUMMARY_ERROR_PREVIEW) {
                lines.push(format!("  extra   {}", path.display()));
            }
        }
    }

    lines.join("\n")
}
