//! Error types for partitioned store operations

use std::fmt::Debug;
use std::time::Duration;

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error codes the store returns when a request is rate limited
const THROTTLING_CODES: [&str; 3] = [
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// Errors raised by a partitioned store client
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store rejected the request because of rate limiting.
    ///
    /// Client-level retries have already been exhausted when this surfaces.
    #[error("Request was throttled by the store")]
    Throttled {
        /// Delay suggested by the store before retrying, when known
        retry_after: Option<Duration>,
    },

    /// The record's partition attribute does not match the partition value of the call
    #[error("Record attribute `{attribute}` does not match the partition value")]
    PartitionMismatch {
        /// Name of the partition attribute
        attribute: String,
    },

    /// Failed to convert a record from or to a store document
    #[error("Failed to convert record: {0}")]
    SerializationError(String),

    /// Any other failure reported by the store
    #[error("Store request failed: {0}")]
    Backend(String),
}

impl StoreError {
    /// Classifies an SDK error, separating throttling from every other failure
    pub(crate) fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + Debug,
        R: Debug,
    {
        if err.code().is_some_and(|code| THROTTLING_CODES.contains(&code)) {
            return Self::Throttled { retry_after: None };
        }

        Self::Backend(format!("{err:?}"))
    }
}

impl From<serde_dynamo::Error> for StoreError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_mismatch_message() {
        let err = StoreError::PartitionMismatch {
            attribute: "userId".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Record attribute `userId` does not match the partition value"
        );
    }
}
