//! Crate-level error type.

use crate::auth::AuthError;
use crate::model::PreconditionError;
use crate::notes::NotesError;
use crate::storage::StorageError;

/// Errors surfaced by the dashboard layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single-row query matched nothing.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// The store or its transport failed.
    #[error("Store error: {0}")]
    Store(StorageError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Notes error: {0}")]
    Notes(#[from] NotesError),
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { table, key } => Error::NotFound { entity: table, key },
            other => Error::Store(other),
        }
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
