//! Session-boundary error types

use thiserror::Error;

/// Errors from the worker and history boundaries
#[derive(Debug, Error)]
pub enum SessionError {
    /// A second run was requested while one is still in flight
    #[error("an analysis run is already in flight")]
    RunInFlight,

    /// History store I/O failure
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A history record that cannot be serialized or parsed
    #[error("history record error: {0}")]
    Record(#[from] serde_json::Error),

    /// Lookup of an id with no record on disk
    #[error("history record '{0}' not found")]
    RecordNotFound(String),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
