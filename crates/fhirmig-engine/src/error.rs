use thiserror::Error;

/// Errors that can occur while orchestrating a migration run.
///
/// Only loading and partitioning failures abort a run; everything past the
/// dispatch boundary is isolated per chunk and lands in the report instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("chunk_size must be at least 1")]
    InvalidChunkSize,

    #[error("worker_count must be at least 1")]
    InvalidWorkerCount,

    #[error("No chunk processor registered for data type: {name}")]
    UnknownDataType { name: String },

    #[error("Failed to load prior outcomes: {0}")]
    Load(#[from] fhirmig_storage::StorageError),
}

impl EngineError {
    /// Create a new UnknownDataType error
    pub fn unknown_data_type(name: impl Into<String>) -> Self {
        Self::UnknownDataType { name: name.into() }
    }
}

/// Convenience result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            EngineError::InvalidChunkSize.to_string(),
            "chunk_size must be at least 1"
        );
        assert_eq!(
            EngineError::unknown_data_type("plan_command").to_string(),
            "No chunk processor registered for data type: plan_command"
        );
    }
}
