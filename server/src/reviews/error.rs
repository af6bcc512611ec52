//! Errors returned by review operations.

use crate::reviews::{RecordError, ReviewId};
use crate::storage::StoreError;

/// Errors that can occur while working with reviews.
#[derive(Debug)]
pub enum ReviewError {
    /// No review exists with this id.
    NotFound(ReviewId),
    /// The caller supplied an unusable value.
    InvalidInput(String),
    /// A stored review has a field that does not parse.
    CorruptRecord { id: ReviewId, source: RecordError },
    /// The underlying store failed.
    Store(StoreError),
}

impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "review {id} not found"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::CorruptRecord { id, source } => write!(f, "review {id} is corrupt: {source}"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for ReviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CorruptRecord { source, .. } => Some(source),
            Self::Store(e) => Some(e),
            Self::NotFound(_) | Self::InvalidInput(_) => None,
        }
    }
}

impl From<StoreError> for ReviewError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
