use std::collections::HashSet;

use fhirmig_core::{OutcomeCategory, OutcomeEntry, RecordId};

use crate::DynBlobStore;
use crate::error::StorageError;
use crate::traits::BlobStore;

/// Maximum write attempts for one outcome line.
pub const APPEND_ATTEMPTS: u32 = 3;

/// Append-only, per-category outcome logs for one migration data type.
///
/// Logs are named `{category}_{data_type}.csv` (`done_patients.csv`,
/// `error_patients.csv`, …). The first append to a log writes the category
/// header. Appends are internally synchronized: two workers may call
/// [`OutcomeStore::append`] concurrently without interleaving partial lines.
pub struct OutcomeStore {
    store: DynBlobStore,
    data_type: String,
    write_lock: tokio::sync::Mutex<()>,
}

impl OutcomeStore {
    pub fn new(store: DynBlobStore, data_type: impl Into<String>) -> Self {
        Self {
            store,
            data_type: data_type.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Log blob name for a category.
    pub fn log_name(&self, category: OutcomeCategory) -> String {
        format!("{category}_{}.csv", self.data_type)
    }

    /// Reconstructs the set of record ids present in a category log.
    ///
    /// Used at engine startup to build the already-done set from the prior
    /// run's `done` log. The header and any malformed or partially written
    /// trailing line are skipped rather than failing the load.
    pub async fn load_done(
        &self,
        category: OutcomeCategory,
    ) -> Result<HashSet<RecordId>, StorageError> {
        let name = self.log_name(category);
        let Some(content) = self.store.read(&name).await? else {
            return Ok(HashSet::new());
        };

        let mut ids = HashSet::new();
        let mut skipped = 0usize;
        for line in content.lines() {
            if line.trim().is_empty() || line == category.header() {
                continue;
            }
            match OutcomeEntry::parse_line(line) {
                Ok(entry) => {
                    ids.insert(entry.record_id);
                }
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(
                log = %name,
                skipped,
                "Skipped malformed lines while loading prior outcomes"
            );
        }

        Ok(ids)
    }

    /// Appends one outcome entry to its category log.
    ///
    /// Writes the header first when the log does not yet exist. Retries up
    /// to [`APPEND_ATTEMPTS`] times on write failure; an exhausted retry
    /// budget is surfaced to the caller, which logs it as an operational
    /// warning — a lost audit line never aborts the run.
    pub async fn append(
        &self,
        category: OutcomeCategory,
        entry: &OutcomeEntry,
    ) -> Result<(), StorageError> {
        let name = self.log_name(category);
        let _guard = self.write_lock.lock().await;

        let mut content = String::new();
        if !self.store.exists(&name).await? {
            content.push_str(category.header());
            content.push('\n');
        }
        content.push_str(&entry.to_line());
        content.push('\n');

        let mut last_error = String::new();
        for attempt in 1..=APPEND_ATTEMPTS {
            match self.store.append(&name, &content).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(
                        log = %name,
                        attempt,
                        error = %e,
                        "Outcome append attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(StorageError::append_exhausted(
            name,
            APPEND_ATTEMPTS,
            last_error,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::memory::MemoryBlobStore;
    use crate::traits::BlobStore;

    /// Fails the first `failures` appends, then delegates to a memory store.
    struct FlakyStore {
        inner: MemoryBlobStore,
        remaining_failures: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryBlobStore::new(),
                remaining_failures: AtomicU32::new(failures),
            }
        }
    }

    #[async_trait]
    impl BlobStore for FlakyStore {
        async fn exists(&self, name: &str) -> Result<bool, StorageError> {
            self.inner.exists(name).await
        }

        async fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(name).await
        }

        async fn append(&self, name: &str, content: &str) -> Result<(), StorageError> {
            if self.remaining_failures.load(Ordering::SeqCst) > 0 {
                self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StorageError::backend("transient write failure"));
            }
            self.inner.append(name, content).await
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    fn entry(id: &str, detail: &str) -> OutcomeEntry {
        OutcomeEntry::new(id, vec![], detail)
    }

    #[tokio::test]
    async fn test_header_written_on_first_append_only() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = OutcomeStore::new(blobs.clone(), "patients");

        store
            .append(OutcomeCategory::Done, &entry("r1", "created"))
            .await
            .unwrap();
        store
            .append(OutcomeCategory::Done, &entry("r2", "created"))
            .await
            .unwrap();

        let content = blobs.read("done_patients.csv").await.unwrap().unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], OutcomeCategory::Done.header());
        assert!(lines[1].starts_with("r1|"));
        assert!(lines[2].starts_with("r2|"));
    }

    #[tokio::test]
    async fn test_load_done_missing_log_is_empty() {
        let store = OutcomeStore::new(Arc::new(MemoryBlobStore::new()), "patients");
        let done = store.load_done(OutcomeCategory::Done).await.unwrap();
        assert!(done.is_empty());
    }

    #[tokio::test]
    async fn test_load_done_skips_header_and_partial_lines() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = OutcomeStore::new(blobs.clone(), "patients");

        store
            .append(OutcomeCategory::Done, &entry("r1", "created"))
            .await
            .unwrap();
        store
            .append(OutcomeCategory::Done, &entry("r2", "created"))
            .await
            .unwrap();
        // Simulate a crash mid-append: a trailing line with no timestamp.
        blobs.append("done_patients.csv", "r3|trunc").await.unwrap();

        let done = store.load_done(OutcomeCategory::Done).await.unwrap();
        assert_eq!(done.len(), 2);
        assert!(done.contains(&RecordId::new("r1")));
        assert!(done.contains(&RecordId::new("r2")));
        assert!(!done.contains(&RecordId::new("r3")));
    }

    #[tokio::test]
    async fn test_append_retries_transient_failures() {
        let store = OutcomeStore::new(Arc::new(FlakyStore::new(2)), "patients");
        store
            .append(OutcomeCategory::Error, &entry("r1", "boom"))
            .await
            .unwrap();

        let done = store.load_done(OutcomeCategory::Error).await.unwrap();
        assert!(done.contains(&RecordId::new("r1")));
    }

    #[tokio::test]
    async fn test_append_surfaces_exhausted_retries() {
        let store = OutcomeStore::new(Arc::new(FlakyStore::new(APPEND_ATTEMPTS + 1)), "patients");
        let err = store
            .append(OutcomeCategory::Error, &entry("r1", "boom"))
            .await
            .unwrap_err();
        assert!(err.is_append_exhausted());
    }

    #[tokio::test]
    async fn test_log_names_follow_category_and_data_type() {
        let store = OutcomeStore::new(Arc::new(MemoryBlobStore::new()), "medications");
        assert_eq!(
            store.log_name(OutcomeCategory::Done),
            "done_medications.csv"
        );
        assert_eq!(
            store.log_name(OutcomeCategory::Ignored),
            "ignored_medications.csv"
        );
    }
}
