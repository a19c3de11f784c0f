//! The chunk-processor seam and the startup handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fhirmig_core::{RecordError, RecordId, RecordOutcome};
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::counters::Counters;
use crate::error::{EngineError, Result};

/// Whether a run creates new records or re-drives existing ones.
///
/// In `Update` mode the engine does not skip records found in the done log;
/// the processor decides create-vs-update per record and reports
/// [`RecordOutcome::Updated`] where it updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Create,
    Update,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// A chunk-level processing failure.
///
/// Distinct from per-record errors, which are already durably recorded by
/// the time the chunk fails; a `ChunkError` means the processor itself gave
/// up on the remainder of the chunk.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ChunkError {
    pub message: String,
}

impl ChunkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ChunkError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ChunkError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Everything a processor needs while working one chunk: the shared
/// counters, the run mode, and its position in the run.
pub struct ChunkContext {
    counters: Arc<Counters>,
    pub mode: Mode,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl ChunkContext {
    pub fn new(counters: Arc<Counters>, mode: Mode, chunk_index: usize, total_chunks: usize) -> Self {
        Self {
            counters,
            mode,
            chunk_index,
            total_chunks,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Human-readable chunk position for log lines, e.g. `[Chunk-3/12]`.
    pub fn display(&self) -> String {
        format!("[Chunk-{}/{}]", self.chunk_index + 1, self.total_chunks)
    }

    /// Maps one record's terminal classification onto the counters.
    ///
    /// Call this exactly once per record the processor finishes handling;
    /// the closed [`RecordOutcome`] set keeps unexpected failures from being
    /// silently swallowed.
    pub async fn classify(
        &self,
        record_id: &RecordId,
        outcome: std::result::Result<RecordOutcome, RecordError>,
    ) {
        match outcome {
            Ok(RecordOutcome::Created(detail)) => {
                self.counters.record_done(record_id, Vec::new(), &detail).await;
            }
            Ok(RecordOutcome::Updated(detail)) => {
                self.counters
                    .record_updated(record_id, Vec::new(), &detail)
                    .await;
            }
            Ok(RecordOutcome::Ignored(reason)) => {
                self.counters.record_ignored(record_id, &reason).await;
            }
            Err(error) => {
                self.counters
                    .record_error(record_id, error.related.clone(), &error.message)
                    .await;
            }
        }
    }
}

/// Caller-supplied, domain-specific work for one chunk.
///
/// Implementations must classify every record they finish handling through
/// [`ChunkContext::classify`] (or the counters directly). Returning `Err`
/// marks the whole chunk failed; sibling chunks are unaffected and records
/// already classified inside the failed chunk keep their outcomes.
#[async_trait]
pub trait ChunkProcessor: std::fmt::Debug + Send + Sync {
    async fn process(
        &self,
        ctx: &ChunkContext,
        chunk: &Chunk,
    ) -> std::result::Result<(), ChunkError>;
}

/// Data-type → processor table, resolved once at startup.
///
/// Replaces string dispatch deep in the call path: a run looks its handler
/// up exactly once, and an unknown data type fails before anything is
/// loaded or partitioned.
#[derive(Default)]
pub struct ProcessorRegistry {
    handlers: HashMap<String, Arc<dyn ChunkProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, data_type: impl Into<String>, processor: Arc<dyn ChunkProcessor>) {
        self.handlers.insert(data_type.into(), processor);
    }

    pub fn get(&self, data_type: &str) -> Result<Arc<dyn ChunkProcessor>> {
        self.handlers
            .get(data_type)
            .cloned()
            .ok_or_else(|| EngineError::unknown_data_type(data_type))
    }

    /// Registered data types, sorted for stable help/error output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
