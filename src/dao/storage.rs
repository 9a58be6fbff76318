use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness constraint rejected the write; nothing was persisted.
    #[error("duplicate record: {message}")]
    Duplicate { message: String },
    /// The record a write hangs off no longer exists; nothing was persisted.
    #[error("missing parent record: {message}")]
    MissingParent { message: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a uniqueness violation error.
    pub fn duplicate(message: impl Into<String>) -> Self {
        StorageError::Duplicate {
            message: message.into(),
        }
    }

    /// Construct an error for a write whose parent record is gone.
    pub fn missing_parent(message: impl Into<String>) -> Self {
        StorageError::MissingParent {
            message: message.into(),
        }
    }

    /// Whether the error reports a uniqueness violation rather than a backend failure.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Duplicate { .. })
    }
}
