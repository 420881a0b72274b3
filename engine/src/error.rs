//! Error types for the SchoolHub engine.

use crate::{CollectionName, RecordId};
use thiserror::Error;

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("record not found: {collection}/{id}")]
    RecordNotFound {
        collection: CollectionName,
        id: RecordId,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("bulk {0} requires a data object")]
    MissingBulkData(String),
}

impl Error {
    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        Error::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether this error means the addressed record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RecordNotFound { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
