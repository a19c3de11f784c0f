//! Storage error types for the blob and outcome-log layer.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An I/O error from the underlying filesystem.
    #[error("I/O error on {name}: {source}")]
    Io {
        /// The blob name involved.
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// An append did not survive its retry budget.
    #[error("Append to {name} failed after {attempts} attempts: {message}")]
    AppendExhausted {
        /// The blob name involved.
        name: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last underlying failure.
        message: String,
    },

    /// A backend-specific failure (object storage, test doubles, …).
    #[error("Storage backend error: {message}")]
    Backend {
        /// Description of the backend error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Io` error.
    #[must_use]
    pub fn io(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source,
        }
    }

    /// Creates a new `AppendExhausted` error.
    #[must_use]
    pub fn append_exhausted(
        name: impl Into<String>,
        attempts: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::AppendExhausted {
            name: name.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` if this error exhausted the append retry budget.
    #[must_use]
    pub fn is_append_exhausted(&self) -> bool {
        matches!(self, Self::AppendExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::append_exhausted("done_patients.csv", 3, "disk full");
        assert_eq!(
            err.to_string(),
            "Append to done_patients.csv failed after 3 attempts: disk full"
        );
        assert!(err.is_append_exhausted());

        let err = StorageError::backend("bucket unavailable");
        assert_eq!(err.to_string(), "Storage backend error: bucket unavailable");
        assert!(!err.is_append_exhausted());
    }
}
