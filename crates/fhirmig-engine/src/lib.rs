//! # fhirmig-engine
//!
//! The resumable parallel migration engine.
//!
//! A run takes a full input collection (flat or grouped records), removes
//! whatever a prior run already completed, partitions the rest into bounded
//! chunks, processes chunks concurrently on a bounded worker pool, and
//! produces a report in which every input record is accounted for exactly
//! once: `done`, `error`, `ignored`, `already_done` or `updated`.
//!
//! ## Wiring
//!
//! ```ignore
//! use std::sync::Arc;
//! use fhirmig_engine::{MigrationEngine, MigrationInput, Mode};
//! use fhirmig_storage::{LocalBlobStore, OutcomeStore};
//!
//! let blobs = Arc::new(LocalBlobStore::new("data_migration")?);
//! let outcomes = Arc::new(OutcomeStore::new(blobs, "patients"));
//! let engine = MigrationEngine::new(outcomes, "patients")
//!     .with_chunk_size(1000)
//!     .with_worker_count(5);
//! let report = engine.run(MigrationInput::Flat(records), processor).await?;
//! ```
//!
//! The chunk processor is the caller's seam: it performs the domain-specific
//! work for one chunk (payload construction, remote submission, …) and
//! classifies every record it touches through [`ChunkContext::classify`].

pub mod chunk;
pub mod counters;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod processor;
pub mod report;

pub use chunk::{Chunk, ChunkItems, MigrationInput, partition};
pub use counters::Counters;
pub use dispatch::{ChunkFailure, DispatchSummary, dispatch};
pub use engine::{MigrationEngine, RunPhase};
pub use error::{EngineError, Result};
pub use processor::{ChunkContext, ChunkError, ChunkProcessor, Mode, ProcessorRegistry};
pub use report::{MigrationReport, ReasonGroup};
