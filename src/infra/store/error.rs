//! Errors raised by document store drivers.

use std::time::Duration;
use thiserror::Error;

/// Driver-level failure, independent of the backend that produced it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Document {collection}/{id} already exists")]
    DuplicateId { collection: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether repeating the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Result type alias for driver calls
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(StoreError::Unavailable("refused".into()).is_transient());
        assert!(StoreError::Timeout(Duration::from_millis(10)).is_transient());
        assert!(!StoreError::Internal("bad row".into()).is_transient());
        assert!(!StoreError::DuplicateId {
            collection: "widgets".into(),
            id: "1".into()
        }
        .is_transient());
    }
}
