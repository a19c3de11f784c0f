//! # fhirmig-storage
//!
//! Storage layer for the fhirmig migration engine.
//!
//! The engine needs exactly three primitives from its backing storage:
//! does a named blob exist, read it, append to it. [`BlobStore`] captures
//! that contract; [`LocalBlobStore`] backs it with the local filesystem and
//! [`MemoryBlobStore`] backs it with a map for tests.
//!
//! On top of the blob primitives sits [`OutcomeStore`]: append-only,
//! per-category outcome logs (`done_*.csv`, `error_*.csv`, `ignored_*.csv`)
//! plus reconstruction of the already-done record set from a prior run.

mod error;
mod local;
mod memory;
mod outcome_store;
mod traits;

pub use error::StorageError;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use outcome_store::{APPEND_ATTEMPTS, OutcomeStore};
pub use traits::BlobStore;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared blob store trait object.
pub type DynBlobStore = std::sync::Arc<dyn BlobStore>;
