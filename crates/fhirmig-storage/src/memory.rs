use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::traits::BlobStore;

/// In-memory blob store used by tests and dry runs.
///
/// Mirrors the filesystem backend's semantics exactly: append creates, reads
/// of missing blobs return `None`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a blob with content, replacing anything already there.
    pub fn put(&self, name: impl Into<String>, content: impl Into<String>) {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(name.into(), content.into());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.contains_key(name))
    }

    async fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(name).cloned())
    }

    async fn append(&self, name: &str, content: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.entry(name.to_string()).or_default().push_str(content);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
