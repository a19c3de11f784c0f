//! Thread-safe outcome tallies, paired with their durable audit lines.

use std::collections::HashMap;
use std::sync::Arc;

use fhirmig_core::{CounterTotals, OutcomeCategory, OutcomeEntry, RecordId};
use fhirmig_storage::OutcomeStore;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct CounterState {
    totals: CounterTotals,
    error_reasons: HashMap<String, Vec<String>>,
    ignore_reasons: HashMap<String, Vec<String>>,
}

/// Per-run outcome counters.
///
/// Each `record_*` call is one logical action: append the durable outcome
/// line, bump the matching counter, and (for errors/ignores) push the reason
/// multimap entry — all under one lock, so concurrent workers never lose an
/// increment or interleave a multimap append. The lock is held only for the
/// in-memory update plus the single-line write; chunk processors do their
/// blocking I/O outside it.
///
/// An append that exhausts its retries is downgraded to a warning: the
/// counter still moves, the operator is told audit durability was degraded,
/// and the run continues.
pub struct Counters {
    outcomes: Arc<OutcomeStore>,
    state: Mutex<CounterState>,
}

impl Counters {
    pub fn new(outcomes: Arc<OutcomeStore>) -> Self {
        Self {
            outcomes,
            state: Mutex::new(CounterState::default()),
        }
    }

    /// Record was created downstream.
    pub async fn record_done(&self, record_id: &RecordId, related: Vec<String>, detail: &str) {
        let mut state = self.state.lock().await;
        self.append_or_warn(OutcomeCategory::Done, record_id, related, detail)
            .await;
        state.totals.done += 1;
        tracing::debug!(record_id = %record_id, detail, "Record done");
    }

    /// Record already existed and was updated in place (update mode).
    ///
    /// Updated records land in the `done` log — they are handled work as far
    /// as a later resume is concerned — but are tallied separately.
    pub async fn record_updated(&self, record_id: &RecordId, related: Vec<String>, detail: &str) {
        let mut state = self.state.lock().await;
        self.append_or_warn(OutcomeCategory::Done, record_id, related, detail)
            .await;
        state.totals.updated += 1;
        tracing::debug!(record_id = %record_id, detail, "Record updated");
    }

    /// Processing failed for this record; the run continues.
    pub async fn record_error(&self, record_id: &RecordId, related: Vec<String>, message: &str) {
        let mut state = self.state.lock().await;
        self.append_or_warn(OutcomeCategory::Error, record_id, related, message)
            .await;
        state.totals.error += 1;
        state
            .error_reasons
            .entry(flatten(message))
            .or_default()
            .push(record_id.to_string());
        tracing::warn!(record_id = %record_id, message, "Record errored");
    }

    /// Record was deliberately excluded.
    pub async fn record_ignored(&self, record_id: &RecordId, reason: &str) {
        let mut state = self.state.lock().await;
        self.append_or_warn(OutcomeCategory::Ignored, record_id, Vec::new(), reason)
            .await;
        state.totals.ignored += 1;
        state
            .ignore_reasons
            .entry(flatten(reason))
            .or_default()
            .push(record_id.to_string());
        tracing::info!(record_id = %record_id, reason, "Record ignored");
    }

    /// Record completed in a prior run and was skipped before dispatch.
    ///
    /// Counter only — the durable line already exists from that prior run.
    pub async fn record_already_done(&self, record_id: &RecordId, source: &str) {
        let mut state = self.state.lock().await;
        state.totals.already_done += 1;
        tracing::debug!(record_id = %record_id, source, "Record already processed");
    }

    /// Snapshot of the current totals.
    pub async fn totals(&self) -> CounterTotals {
        self.state.lock().await.totals
    }

    /// Reason → affected-ids groups for a category, sorted by frequency
    /// descending (ties broken by reason for a stable report).
    pub async fn reason_breakdown(&self, category: OutcomeCategory) -> Vec<(String, Vec<String>)> {
        let state = self.state.lock().await;
        let map = match category {
            OutcomeCategory::Error => &state.error_reasons,
            OutcomeCategory::Ignored => &state.ignore_reasons,
            OutcomeCategory::Done => return Vec::new(),
        };

        let mut groups: Vec<(String, Vec<String>)> = map
            .iter()
            .map(|(reason, ids)| (reason.clone(), ids.clone()))
            .collect();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
        groups
    }

    async fn append_or_warn(
        &self,
        category: OutcomeCategory,
        record_id: &RecordId,
        related: Vec<String>,
        detail: &str,
    ) {
        let entry = OutcomeEntry::new(record_id.clone(), related, detail);
        if let Err(e) = self.outcomes.append(category, &entry).await {
            tracing::warn!(
                record_id = %record_id,
                category = %category,
                error = %e,
                "Audit line lost; outcome counted without a durable record"
            );
        }
    }
}

fn flatten(reason: &str) -> String {
    reason.replace(['\n', '\r'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirmig_storage::{BlobStore, MemoryBlobStore};

    fn counters() -> (Arc<MemoryBlobStore>, Counters) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let outcomes = Arc::new(OutcomeStore::new(blobs.clone(), "patients"));
        (blobs, Counters::new(outcomes))
    }

    #[tokio::test]
    async fn test_each_category_moves_exactly_one_counter() {
        let (_, counters) = counters();
        let id = RecordId::new("r1");

        counters.record_done(&id, vec![], "created").await;
        counters.record_updated(&id, vec![], "updated").await;
        counters.record_error(&id, vec![], "boom").await;
        counters.record_ignored(&id, "no map").await;
        counters.record_already_done(&id, "done log").await;

        let totals = counters.totals().await;
        assert_eq!(totals.done, 1);
        assert_eq!(totals.updated, 1);
        assert_eq!(totals.error, 1);
        assert_eq!(totals.ignored, 1);
        assert_eq!(totals.already_done, 1);
        assert_eq!(totals.total(), 5);
    }

    #[tokio::test]
    async fn test_done_and_updated_share_the_done_log() {
        let (blobs, counters) = counters();
        counters
            .record_done(&RecordId::new("a"), vec![], "created")
            .await;
        counters
            .record_updated(&RecordId::new("b"), vec![], "updated")
            .await;

        let content = blobs.read("done_patients.csv").await.unwrap().unwrap();
        assert_eq!(content.lines().count(), 3); // header + 2 entries
    }

    #[tokio::test]
    async fn test_already_done_appends_nothing() {
        let (blobs, counters) = counters();
        counters
            .record_already_done(&RecordId::new("a"), "done log")
            .await;

        assert!(!blobs.exists("done_patients.csv").await.unwrap());
        assert_eq!(counters.totals().await.already_done, 1);
    }

    #[tokio::test]
    async fn test_reason_breakdown_sorted_by_frequency() {
        let (_, counters) = counters();
        for i in 0..3 {
            counters
                .record_ignored(&RecordId::new(format!("a{i}")), "no patient map")
                .await;
        }
        counters
            .record_ignored(&RecordId::new("b"), "missing provider")
            .await;

        let breakdown = counters.reason_breakdown(OutcomeCategory::Ignored).await;
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].0, "no patient map");
        assert_eq!(breakdown[0].1.len(), 3);
        assert_eq!(breakdown[1].1, vec!["b"]);

        assert!(
            counters
                .reason_breakdown(OutcomeCategory::Done)
                .await
                .is_empty()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_increments_never_lost() {
        let (_, counters) = counters();
        let counters = Arc::new(counters);

        let mut handles = Vec::new();
        for i in 0..200 {
            let counters = counters.clone();
            handles.push(tokio::spawn(async move {
                let id = RecordId::new(format!("r{i}"));
                if i % 2 == 0 {
                    counters.record_done(&id, vec![], "created").await;
                } else {
                    counters.record_error(&id, vec![], "boom").await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let totals = counters.totals().await;
        assert_eq!(totals.done, 100);
        assert_eq!(totals.error, 100);
    }
}
