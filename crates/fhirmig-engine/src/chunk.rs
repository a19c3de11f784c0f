//! Deterministic partitioning of the input collection into bounded chunks.

use fhirmig_core::Record;
use indexmap::IndexMap;

use crate::error::{EngineError, Result};

/// The full input collection for one run.
///
/// `Flat` is an ordered sequence of independent records. `Grouped` keys
/// records by a parent (all rows for one patient, say) so that a chunk
/// processor can amortize per-parent setup; grouped partitioning never
/// splits a group across chunks. `IndexMap` preserves insertion order, which
/// keeps the partition deterministic.
#[derive(Debug, Clone)]
pub enum MigrationInput {
    Flat(Vec<Record>),
    Grouped(IndexMap<String, Vec<Record>>),
}

impl MigrationInput {
    /// Total number of underlying records.
    pub fn record_count(&self) -> usize {
        match self {
            Self::Flat(records) => records.len(),
            Self::Grouped(groups) => groups.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(records) => records.is_empty(),
            Self::Grouped(groups) => groups.is_empty(),
        }
    }
}

/// The records carried by one chunk, mirroring the input shape.
#[derive(Debug, Clone)]
pub enum ChunkItems {
    Flat(Vec<Record>),
    Grouped(Vec<(String, Vec<Record>)>),
}

/// A bounded sub-collection of the input, dispatched to exactly one worker.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub items: ChunkItems,
}

impl Chunk {
    /// Number of underlying records in this chunk.
    pub fn record_count(&self) -> usize {
        match &self.items {
            ChunkItems::Flat(records) => records.len(),
            ChunkItems::Grouped(groups) => groups.iter().map(|(_, rows)| rows.len()).sum(),
        }
    }

    /// Iterates every record in the chunk, flattening groups in order.
    pub fn records(&self) -> Box<dyn Iterator<Item = &Record> + Send + '_> {
        match &self.items {
            ChunkItems::Flat(records) => Box::new(records.iter()),
            ChunkItems::Grouped(groups) => {
                Box::new(groups.iter().flat_map(|(_, rows)| rows.iter()))
            }
        }
    }
}

/// Splits the input into ordered chunks of at most `chunk_size` units.
///
/// For flat input a unit is one record; for grouped input a unit is one
/// group, so a chunk may carry a variable number of underlying records. The
/// partition is deterministic: identical input and size always produce
/// identical chunk boundaries. No chunk is ever empty; the last chunk may be
/// short.
pub fn partition(input: MigrationInput, chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(EngineError::InvalidChunkSize);
    }

    let chunks = match input {
        MigrationInput::Flat(records) => records
            .chunks(chunk_size)
            .map(|slice| ChunkItems::Flat(slice.to_vec()))
            .collect::<Vec<_>>(),
        MigrationInput::Grouped(groups) => {
            let pairs: Vec<(String, Vec<Record>)> = groups.into_iter().collect();
            pairs
                .chunks(chunk_size)
                .map(|slice| ChunkItems::Grouped(slice.to_vec()))
                .collect()
        }
    };

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, items)| Chunk { index, items })
        .collect())
}
