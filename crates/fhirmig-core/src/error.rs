use thiserror::Error;

/// Core error types for fhirmig operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Record is missing required field: {field}")]
    MissingField { field: String },

    #[error("Malformed outcome line: {line}")]
    MalformedLine { line: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Timestamp formatting error: {0}")]
    TimeError(#[from] time::error::Format),
}

impl CoreError {
    /// Create a new InvalidRecord error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a new MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a new MalformedLine error
    pub fn malformed_line(line: impl Into<String>) -> Self {
        Self::MalformedLine { line: line.into() }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
