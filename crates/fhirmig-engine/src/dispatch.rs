//! Bounded worker pool over the chunk sequence.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::chunk::Chunk;
use crate::counters::Counters;
use crate::error::{EngineError, Result};
use crate::processor::{ChunkContext, ChunkError, ChunkProcessor, Mode};

/// One chunk's fatal failure, surfaced in the final report separately from
/// per-record errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_index: usize,
    pub message: String,
}

/// Outcome of dispatching every chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<ChunkFailure>,
}

/// Runs every chunk through `processor` with at most `worker_count` chunks
/// in flight.
///
/// Fault isolation: a processor error (or a panicked task) is recorded as a
/// chunk-level failure and the remaining chunks still run; nothing is
/// retried. Completion order across chunks is whatever the scheduler
/// produces — any required ordering within a chunk is the processor's
/// responsibility.
pub async fn dispatch(
    chunks: Vec<Chunk>,
    worker_count: usize,
    processor: Arc<dyn ChunkProcessor>,
    counters: Arc<Counters>,
    mode: Mode,
) -> Result<DispatchSummary> {
    if worker_count == 0 {
        return Err(EngineError::InvalidWorkerCount);
    }

    let total_chunks = chunks.len();
    let semaphore = Arc::new(Semaphore::new(worker_count));

    let mut handles = Vec::with_capacity(total_chunks);
    for chunk in chunks {
        let semaphore = semaphore.clone();
        let processor = processor.clone();
        let counters = counters.clone();
        let chunk_index = chunk.index;

        let handle = tokio::spawn(async move {
            // Closing the semaphore is not part of this design; acquire only
            // fails if it were, so treat that as a chunk failure.
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| ChunkError::from("worker pool closed"))?;

            let ctx = ChunkContext::new(counters, mode, chunk.index, total_chunks);
            tracing::debug!(
                chunk = %ctx.display(),
                records = chunk.record_count(),
                "Processing chunk"
            );

            let result = processor.process(&ctx, &chunk).await;
            match &result {
                Ok(()) => tracing::debug!(chunk = %ctx.display(), "Completed chunk"),
                Err(e) => tracing::error!(chunk = %ctx.display(), error = %e, "Chunk failed"),
            }
            result
        });
        handles.push(async move { (chunk_index, handle.await) });
    }

    let mut summary = DispatchSummary::default();
    for (chunk_index, joined) in join_all(handles).await {
        match joined {
            Ok(Ok(())) => summary.succeeded += 1,
            Ok(Err(e)) => {
                summary.failed += 1;
                summary.failures.push(ChunkFailure {
                    chunk_index,
                    message: e.to_string(),
                });
            }
            Err(join_error) => {
                summary.failed += 1;
                summary.failures.push(ChunkFailure {
                    chunk_index,
                    message: format!("chunk task panicked: {join_error}"),
                });
            }
        }
    }
    summary.failures.sort_by_key(|f| f.chunk_index);

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        workers = worker_count,
        "Dispatch complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use fhirmig_core::{Record, RecordOutcome};
    use fhirmig_storage::{MemoryBlobStore, OutcomeStore};

    use super::*;
    use crate::chunk::{MigrationInput, partition};

    fn counters() -> Arc<Counters> {
        let blobs = Arc::new(MemoryBlobStore::new());
        let outcomes = Arc::new(OutcomeStore::new(blobs, "patients"));
        Arc::new(Counters::new(outcomes))
    }

    fn chunks_of(total: usize, chunk_size: usize) -> Vec<Chunk> {
        let records = (0..total).map(|i| Record::new(format!("r{i}"))).collect();
        partition(MigrationInput::Flat(records), chunk_size).unwrap()
    }

    /// Marks every record done; fails entirely on one chunk index.
    #[derive(Debug)]
    struct FailOn {
        fail_index: Option<usize>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FailOn {
        fn new(fail_index: Option<usize>) -> Self {
            Self {
                fail_index,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChunkProcessor for FailOn {
        async fn process(
            &self,
            ctx: &ChunkContext,
            chunk: &Chunk,
        ) -> std::result::Result<(), ChunkError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;

            let result = if self.fail_index == Some(ctx.chunk_index) {
                Err(ChunkError::from("synthetic chunk fault"))
            } else {
                for record in chunk.records() {
                    ctx.classify(&record.id, Ok(RecordOutcome::Created("ok".into())))
                        .await;
                }
                Ok(())
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_all_chunks_succeed() {
        let counters = counters();
        let summary = dispatch(
            chunks_of(50, 10),
            5,
            Arc::new(FailOn::new(None)),
            counters.clone(),
            Mode::Create,
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(counters.totals().await.done, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_failed_chunk_does_not_abort_siblings() {
        let counters = counters();
        let summary = dispatch(
            chunks_of(50, 10),
            5,
            Arc::new(FailOn::new(Some(2))),
            counters.clone(),
            Mode::Create,
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].chunk_index, 2);
        assert_eq!(summary.failures[0].message, "synthetic chunk fault");
        // The other four chunks' records were all tallied.
        assert_eq!(counters.totals().await.done, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_worker_count_bounds_concurrency() {
        let processor = Arc::new(FailOn::new(None));
        dispatch(chunks_of(60, 5), 3, processor.clone(), counters(), Mode::Create)
            .await
            .unwrap();

        assert!(processor.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let err = dispatch(
            chunks_of(10, 5),
            0,
            Arc::new(FailOn::new(None)),
            counters(),
            Mode::Create,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidWorkerCount));
    }

    #[tokio::test]
    async fn test_empty_chunk_list_is_a_noop() {
        let summary = dispatch(
            Vec::new(),
            5,
            Arc::new(FailOn::new(None)),
            counters(),
            Mode::Create,
        )
        .await
        .unwrap();
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
    }
}
