use std::error::Error as StdError;

use thiserror::Error;

/// Outcome of a [`GameStore`](crate::dao::game_store::GameStore) call.
pub type StorageResult<T> = Result<T, StorageError>;

type BackendError = Box<dyn StdError + Send + Sync>;

/// Failures every store backend reports in the same shape.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Backend error.
        #[source]
        source: BackendError,
    },
    /// The record a write targets does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// A unique key (game code, membership, player name) is already taken.
    #[error("{0} already exists")]
    Conflict(String),
}

impl StorageError {
    /// Wrap a backend failure, keeping it as the error source.
    pub fn unavailable(message: String, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
