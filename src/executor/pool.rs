//! Bounded-width transfer pool.
//!
//! The traversal loop submits jobs one at a time. `submit` blocks while
//! every worker slot is busy, which keeps at most `width` copies in flight
//! and bounds memory no matter how large the tree is. `finish` is the
//! completion barrier: it waits until every slot is free again.

use crate::executor::copy::{copy_file_atomic, ensure_parent_dir};
use crate::executor::stats::ResultAggregator;
use crate::executor::{emit_event, EventCallback, SyncEvent};
use crate::types::{PendingJob, RunStatistics, SyncError, TransferOutcome};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;
use tracing::trace;

/// Runs copy jobs on a fixed number of worker slots
pub struct TransferScheduler {
    runtime: Runtime,
    permits: Arc<Semaphore>,
    width: usize,
    dry_run: bool,
    aggregator: Arc<ResultAggregator>,
    on_event: Option<Arc<EventCallback>>,
}

impl TransferScheduler {
    /// Create a pool with `width` worker slots (minimum 1)
    pub fn new(width: usize, aggregator: Arc<ResultAggregator>) -> Result<Self, SyncError> {
        let width = width.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(width)
            .thread_name("simsync-worker")
            .enable_all()
            .build()
            .map_err(|e| SyncError::Scheduler(format!("cannot start worker pool: {}", e)))?;

        Ok(Self {
            runtime,
            permits: Arc::new(Semaphore::new(width)),
            width,
            dry_run: false,
            aggregator,
            on_event: None,
        })
    }

    /// Record jobs as would-be copies instead of running them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Receive an event for every finished job
    pub fn on_event(mut self, callback: Option<Arc<EventCallback>>) -> Self {
        self.on_event = callback;
        self
    }

    /// Number of jobs currently running
    pub fn in_flight(&self) -> usize {
        self.width - self.permits.available_permits()
    }

    /// Hand a job to a free worker, waiting for one if all are busy.
    ///
    /// The outcome is recorded and its event emitted before the worker slot
    /// is released, so once [`finish`](Self::finish) returns every
    /// submitted job is accounted for.
    pub fn submit(&self, job: PendingJob) -> Result<(), SyncError> {
        if self.dry_run {
            // Nothing is read or written; report the size that would move.
            let bytes = fs::metadata(&job.source).map(|m| m.len()).unwrap_or(0);
            self.aggregator
                .record_outcome(&TransferOutcome::success(job.relative.clone(), bytes));
            emit_event(
                self.on_event.as_deref(),
                SyncEvent::CopySuccess {
                    path: job.relative,
                    bytes,
                    dry_run: true,
                },
            );
            return Ok(());
        }

        let permit = self
            .runtime
            .block_on(Arc::clone(&self.permits).acquire_owned())
            .map_err(|e| SyncError::Scheduler(format!("worker pool closed: {}", e)))?;

        trace!(
            path = %job.relative.display(),
            in_flight = self.in_flight(),
            "dispatching copy"
        );

        let aggregator = Arc::clone(&self.aggregator);
        let on_event = self.on_event.clone();

        self.runtime.spawn_blocking(move || {
            let on_event = on_event.as_deref();
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| run_job(&job, on_event))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    TransferOutcome::failure(job.relative.clone(), panic_message(payload.as_ref()))
                }
            };

            aggregator.record_outcome(&outcome);
            let event = match outcome.error {
                None => SyncEvent::CopySuccess {
                    path: outcome.path,
                    bytes: outcome.bytes,
                    dry_run: false,
                },
                Some(error) => SyncEvent::CopyFailure {
                    path: outcome.path,
                    error,
                },
            };
            emit_event(on_event, event);

            drop(permit);
        });

        Ok(())
    }

    /// Wait for every in-flight job, then return the final counters
    pub fn finish(self) -> Result<RunStatistics, SyncError> {
        let width = u32::try_from(self.width)
            .map_err(|_| SyncError::Scheduler("worker pool too wide".to_string()))?;

        let all = self
            .runtime
            .block_on(self.permits.acquire_many(width))
            .map_err(|e| SyncError::Scheduler(format!("worker pool closed: {}", e)))?;
        drop(all);

        Ok(self.aggregator.snapshot())
    }
}

/// Copy one file. Never panics on I/O failure; every error becomes a
/// failed outcome.
fn run_job(job: &PendingJob, on_event: Option<&EventCallback>) -> TransferOutcome {
    match ensure_parent_dir(&job.destination) {
        Ok(true) => {
            if let Some(parent) = job.relative.parent() {
                emit_event(
                    on_event,
                    SyncEvent::DirectoryCreated {
                        path: parent.to_path_buf(),
                    },
                );
            }
        }
        Ok(false) => {}
        Err(e) => {
            let parent = job.relative.parent().unwrap_or(&job.relative).to_path_buf();
            emit_event(
                on_event,
                SyncEvent::DirectoryError {
                    path: parent,
                    error: e.to_string(),
                },
            );
            return TransferOutcome::failure(
                job.relative.clone(),
                format!("cannot create parent directory: {}", e),
            );
        }
    }

    match copy_file_atomic(&job.source, &job.destination, job.overwrite) {
        Ok(bytes) => TransferOutcome::success(job.relative.clone(), bytes),
        Err(e) => TransferOutcome::failure(job.relative.clone(), e.to_string()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("worker panicked: {}", detail)
}
