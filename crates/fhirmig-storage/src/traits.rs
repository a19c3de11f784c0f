//! The storage trait every blob backend must implement.

use async_trait::async_trait;

use crate::error::StorageError;

/// Minimal named-blob contract the migration engine needs from storage.
///
/// Implementations must be thread-safe (`Send + Sync`); the outcome store
/// calls them from concurrent workers. A single `append` call must land the
/// given content in one piece, but implementations are not required to
/// serialize concurrent appends — [`crate::OutcomeStore`] holds its own lock
/// for that.
///
/// # Example
///
/// ```ignore
/// use fhirmig_storage::{BlobStore, StorageError};
///
/// async fn seen_before(store: &dyn BlobStore, name: &str) -> Result<bool, StorageError> {
///     store.exists(name).await
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns whether the named blob exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, never for a missing
    /// blob.
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Reads the full content of the named blob.
    ///
    /// Returns `None` if the blob does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn read(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Appends `content` to the named blob, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; callers decide whether to retry.
    async fn append(&self, name: &str, content: &str) -> Result<(), StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that BlobStore is object-safe
    fn _assert_blob_store_object_safe(_: &dyn BlobStore) {}
}
