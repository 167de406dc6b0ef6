//! Error types for memo-core

use thiserror::Error;

/// Result type alias using memo-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in memo-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Server unreachable or the connection dropped mid-request
    #[error("Network error: {0}")]
    Network(String),

    /// Bounded request timeout exceeded
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Server answered 2xx but the body did not match the contract
    #[error("Invalid server payload: {0}")]
    InvalidPayload(String),
}

impl Error {
    /// True for errors meaning the server could not be reached at all.
    ///
    /// A connectivity failure during the tombstone drain aborts the whole
    /// cycle so deletes stay ordered ahead of pushes and pulls.
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// True when retrying the same request later may succeed.
    ///
    /// Connectivity failures and 5xx responses are retryable; other HTTP
    /// statuses are permanent for the item that triggered them.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
