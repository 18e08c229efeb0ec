//! Error types for vector store operations.

use thiserror::Error;

/// Result type for vector store operations.
pub type VectorResult<T, E = VectorError> = Result<T, E>;

/// Vector store errors.
#[derive(Debug, Error)]
pub enum VectorError {
    /// The backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected the supplied credentials.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The backend did not answer in time.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Collection or table not found.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The caller supplied malformed arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend index rejected a vector of the wrong length.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Backend-specific error.
    #[error("backend error{}: {message}", code_suffix(.code))]
    Backend {
        /// Error code reported by the backend, if any.
        code: Option<String>,
        /// Human readable message.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Some records of a bulk write were not stored.
    #[error("partial failure: {failed}/{total} records were not written")]
    PartialFailure {
        /// Number of records that failed or were skipped.
        failed: usize,
        /// Number of records submitted.
        total: usize,
    },
}

impl VectorError {
    /// Creates a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Creates a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound(name.into())
    }

    /// Creates an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates a dimension mismatch error from the expected and actual lengths.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch(format!("expected {expected}, got {actual}"))
    }

    /// Creates a backend error without an error code.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            code: None,
            message: msg.into(),
        }
    }

    /// Creates a backend error carrying the backend's error code.
    pub fn backend_with_code(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Backend {
            code: Some(code.into()),
            message: msg.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a partial failure error.
    pub fn partial_failure(failed: usize, total: usize) -> Self {
        Self::PartialFailure { failed, total }
    }

    /// Returns `true` if repeating the same call unchanged may succeed.
    ///
    /// Dimension mismatches and invalid input are not transient: the caller has
    /// to fix the request before retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::PartialFailure { .. }
        )
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
