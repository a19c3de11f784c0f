use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;
use crate::traits::BlobStore;

/// Filesystem-backed blob store.
///
/// Blobs are plain files beneath a root directory. This is the production
/// default backend; swapping in object storage means implementing
/// [`BlobStore`] against that service, nothing in the engine changes.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Creates the store, creating the root directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    /// The directory this store writes beneath.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        tokio::fs::try_exists(self.path_for(name))
            .await
            .map_err(|e| StorageError::io(name, e))
    }

    async fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(name)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    async fn append(&self, name: &str, content: &str) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(name))
            .await
            .map_err(|e| StorageError::io(name, e))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StorageError::io(name, e))?;
        file.flush().await.map_err(|e| StorageError::io(name, e))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
