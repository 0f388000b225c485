//! Common error types for rate-the-clip

use thiserror::Error;

/// Common result type for rate-the-clip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the store, the aggregator and the media layer
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    ///
    /// Store unavailable or write failed. Never retried by the core.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown person, missing media file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed identifier or a request the rules reject
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A clip in a rating session was already rated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// External helper (duration probe) failed or produced garbage
    #[error("External tool error: {0}")]
    ExternalTool(String),

    /// Internal server error (corrupt stored data and the like)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Validation(_) | Error::Conflict(_)
        )
    }
}
