use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or answered with an error.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The record changed since the caller's version token was issued.
    #[error("room `{0}` was modified concurrently")]
    Conflict(String),
    /// Another live room already owns this code.
    #[error("room code `{0}` is already taken")]
    DuplicateCode(String),
    /// Another room already holds this match slot of the series.
    #[error("series `{series_id}` already has match {match_number}")]
    DuplicateSeriesMatch {
        /// Series of the rejected room.
        series_id: String,
        /// Slot already taken.
        match_number: i64,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
