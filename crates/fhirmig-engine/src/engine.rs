//! End-to-end run orchestration.

use std::collections::HashSet;
use std::sync::Arc;

use fhirmig_core::{OutcomeCategory, RecordId};
use fhirmig_storage::OutcomeStore;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::chunk::{MigrationInput, partition};
use crate::counters::Counters;
use crate::dispatch::dispatch;
use crate::error::{EngineError, Result};
use crate::processor::{ChunkProcessor, Mode};
use crate::report::{MigrationReport, ReasonGroup};

/// Lifecycle of one run, for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initializing,
    Loading,
    Partitioning,
    Dispatching,
    Aggregating,
    Reporting,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Loading => write!(f, "loading"),
            Self::Partitioning => write!(f, "partitioning"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Reporting => write!(f, "reporting"),
        }
    }
}

/// Orchestrates one resumable migration run.
///
/// Wires the outcome store, counters, partitioner and worker pool together:
/// loads prior `done` outcomes, skips records already handled (create mode),
/// partitions the rest, dispatches chunks, and returns the aggregate report.
/// A failure during loading or partitioning aborts the run; once dispatching
/// starts, failures are isolated per chunk and the run always reaches its
/// report.
pub struct MigrationEngine {
    outcomes: Arc<OutcomeStore>,
    data_type: String,
    chunk_size: usize,
    worker_count: usize,
    mode: Mode,
    extra_done: HashSet<RecordId>,
}

impl MigrationEngine {
    pub fn new(outcomes: Arc<OutcomeStore>, data_type: impl Into<String>) -> Self {
        Self {
            outcomes,
            data_type: data_type.into(),
            chunk_size: 1000,
            worker_count: 5,
            mode: Mode::Create,
            extra_done: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Seeds additional already-processed ids from an external signal (e.g.
    /// an "already exists" check against the target system).
    #[must_use]
    pub fn with_already_done(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.extra_done.extend(ids);
        self
    }

    /// Executes the run and returns its report.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal pre-dispatch failures: an unreadable
    /// prior outcome log, a zero chunk size, or a zero worker count.
    pub async fn run(
        &self,
        input: MigrationInput,
        processor: Arc<dyn ChunkProcessor>,
    ) -> Result<MigrationReport> {
        if self.worker_count == 0 {
            return Err(EngineError::InvalidWorkerCount);
        }

        let run_id = Uuid::new_v4();
        let started_at = OffsetDateTime::now_utc();
        let submitted = input.record_count() as u64;

        self.enter(run_id, RunPhase::Initializing);
        tracing::info!(
            run_id = %run_id,
            data_type = %self.data_type,
            mode = %self.mode,
            records = submitted,
            chunk_size = self.chunk_size,
            workers = self.worker_count,
            "Starting migration run"
        );

        self.enter(run_id, RunPhase::Loading);
        let mut already_done = self.outcomes.load_done(OutcomeCategory::Done).await?;
        already_done.extend(self.extra_done.iter().cloned());
        tracing::info!(
            run_id = %run_id,
            prior_done = already_done.len(),
            "Loaded prior outcomes"
        );

        let counters = Arc::new(Counters::new(self.outcomes.clone()));

        self.enter(run_id, RunPhase::Partitioning);
        let input = match self.mode {
            // Update mode reprocesses everything; the processor decides
            // create vs update per record.
            Mode::Update => input,
            Mode::Create => filter_already_done(input, &already_done, &counters).await,
        };
        let chunks = partition(input, self.chunk_size)?;
        let chunks_total = chunks.len();
        tracing::info!(run_id = %run_id, chunks = chunks_total, "Partitioned input");

        self.enter(run_id, RunPhase::Dispatching);
        let summary = dispatch(
            chunks,
            self.worker_count,
            processor,
            counters.clone(),
            self.mode,
        )
        .await?;

        self.enter(run_id, RunPhase::Aggregating);
        let totals = counters.totals().await;
        if summary.failed == 0 {
            debug_assert_eq!(
                totals.total(),
                submitted,
                "every submitted record must be classified exactly once"
            );
        }

        self.enter(run_id, RunPhase::Reporting);
        let report = MigrationReport {
            run_id,
            data_type: self.data_type.clone(),
            mode: self.mode,
            submitted,
            totals,
            chunks_total,
            chunks_succeeded: summary.succeeded,
            chunks_failed: summary.failed,
            chunk_failures: summary.failures,
            error_breakdown: ReasonGroup::from_breakdown(
                counters.reason_breakdown(OutcomeCategory::Error).await,
            ),
            ignore_breakdown: ReasonGroup::from_breakdown(
                counters.reason_breakdown(OutcomeCategory::Ignored).await,
            ),
            started_at,
            finished_at: OffsetDateTime::now_utc(),
        };

        tracing::info!(
            run_id = %run_id,
            done = report.totals.done,
            updated = report.totals.updated,
            errors = report.totals.error,
            ignored = report.totals.ignored,
            already_done = report.totals.already_done,
            chunks_failed = report.chunks_failed,
            "Migration run finished"
        );

        Ok(report)
    }

    fn enter(&self, run_id: Uuid, phase: RunPhase) {
        tracing::debug!(run_id = %run_id, phase = %phase, "Entering phase");
    }
}

/// Removes records a prior run already completed, tallying each as
/// `already_done`. Grouped inputs are filtered per record; a group whose
/// records were all handled is dropped entirely.
async fn filter_already_done(
    input: MigrationInput,
    already_done: &HashSet<RecordId>,
    counters: &Counters,
) -> MigrationInput {
    match input {
        MigrationInput::Flat(records) => {
            let mut kept = Vec::with_capacity(records.len());
            for record in records {
                if already_done.contains(&record.id) {
                    counters.record_already_done(&record.id, "done log").await;
                } else {
                    kept.push(record);
                }
            }
            MigrationInput::Flat(kept)
        }
        MigrationInput::Grouped(groups) => {
            let mut kept = indexmap::IndexMap::with_capacity(groups.len());
            for (key, records) in groups {
                let mut kept_records = Vec::with_capacity(records.len());
                for record in records {
                    if already_done.contains(&record.id) {
                        counters.record_already_done(&record.id, "done log").await;
                    } else {
                        kept_records.push(record);
                    }
                }
                if !kept_records.is_empty() {
                    kept.insert(key, kept_records);
                }
            }
            MigrationInput::Grouped(kept)
        }
    }
}
