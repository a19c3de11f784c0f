//! The structured end-of-run summary.

use fhirmig_core::CounterTotals;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dispatch::ChunkFailure;
use crate::processor::Mode;

/// One reason and the records it affected, for the detail breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonGroup {
    pub reason: String,
    pub count: usize,
    pub record_ids: Vec<String>,
}

impl ReasonGroup {
    /// Converts a counters breakdown (already sorted by frequency) into
    /// report groups.
    pub fn from_breakdown(breakdown: Vec<(String, Vec<String>)>) -> Vec<Self> {
        breakdown
            .into_iter()
            .map(|(reason, record_ids)| Self {
                reason,
                count: record_ids.len(),
                record_ids,
            })
            .collect()
    }
}

/// Final report of one migration run.
///
/// Produced on every non-fatal run. When no chunk failed, the counter totals
/// sum to `submitted`; a failed chunk's unclassified remainder shows up as
/// the gap between the two, so partial failure is visible, never silent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub data_type: String,
    pub mode: Mode,
    pub submitted: u64,
    pub totals: CounterTotals,
    pub chunks_total: usize,
    pub chunks_succeeded: usize,
    pub chunks_failed: usize,
    pub chunk_failures: Vec<ChunkFailure>,
    pub error_breakdown: Vec<ReasonGroup>,
    pub ignore_breakdown: Vec<ReasonGroup>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

impl MigrationReport {
    /// Whether every submitted record was classified. Holds exactly when no
    /// chunk failed mid-flight.
    pub fn covers_input(&self) -> bool {
        self.totals.total() == self.submitted
    }

    /// Records that vanished into failed chunks without a classification.
    pub fn unaccounted(&self) -> u64 {
        self.submitted.saturating_sub(self.totals.total())
    }
}
