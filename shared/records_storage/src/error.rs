//! Error taxonomy shared by the repositories
//!
//! Expected outcomes are not errors: a missing record is `None` and an identifier collision
//! is [`crate::store::CreateOutcome::Conflict`]. What remains is either transient or fatal.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Classified repository failure
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The store is rate limiting requests; the caller may retry later
    #[error("Store is rate limiting requests")]
    Transient {
        /// Delay suggested by the store, when known
        retry_after: Option<Duration>,
    },

    /// Any other store failure, propagated unchanged
    #[error(transparent)]
    Fatal(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Throttled { retry_after } => {
                tracing::warn!(?retry_after, "Rate limit exceeded");
                Self::Transient { retry_after }
            }
            err => {
                tracing::error!(error = %err, "Store operation failed");
                Self::Fatal(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttling_is_transient() {
        let err = RepositoryError::from(StoreError::Throttled {
            retry_after: Some(Duration::from_secs(1)),
        });

        assert!(matches!(
            err,
            RepositoryError::Transient { retry_after: Some(d) } if d == Duration::from_secs(1)
        ));
    }

    #[test]
    fn test_other_failures_are_fatal() {
        let err = RepositoryError::from(StoreError::Backend("connection reset".to_string()));

        assert!(matches!(err, RepositoryError::Fatal(StoreError::Backend(_))));
        assert_eq!(err.to_string(), "Store request failed: connection reset");
    }
}
