//! Partitioned document store client
//!
//! Every point operation is scoped to a collection and a partition value. A record stored
//! under one partition value cannot be read, replaced or deleted through another one, even
//! when the identifier matches.

mod dynamodb;
mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::{de::DeserializeOwned, Serialize};

pub use dynamodb::DynamoDbStore;
pub use error::{StoreError, StoreResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;

/// A record as it travels through the store client
pub type Document = HashMap<String, AttributeValue>;

/// Default number of records fetched per query page
pub const DEFAULT_PAGE_SIZE: i32 = 100;

/// Attribute holding the record identifier in every collection
pub const ID_ATTRIBUTE: &str = "id";

/// Attribute holding the store-assigned concurrency token
pub const CONCURRENCY_TOKEN_ATTRIBUTE: &str = "_etag";

/// Describes a named collection and how its records are partitioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    name: String,
    partition_attribute: &'static str,
    concurrency_token: bool,
}

impl Collection {
    /// Creates a collection descriptor
    ///
    /// # Arguments
    ///
    /// * `name` - Table name of the collection
    /// * `partition_attribute` - Record attribute whose value routes the record
    #[must_use]
    pub const fn new(name: String, partition_attribute: &'static str) -> Self {
        Self {
            name,
            partition_attribute,
            concurrency_token: false,
        }
    }

    /// Makes the store stamp a fresh concurrency token on every write
    #[must_use]
    pub const fn with_concurrency_token(mut self) -> Self {
        self.concurrency_token = true;
        self
    }

    /// Table name of the collection
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the partition attribute
    #[must_use]
    pub const fn partition_attribute(&self) -> &'static str {
        self.partition_attribute
    }

    /// Whether writes are stamped with a concurrency token
    #[must_use]
    pub const fn has_concurrency_token(&self) -> bool {
        self.concurrency_token
    }

    /// Checks that `document` belongs to `partition_value` and stamps the concurrency token
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PartitionMismatch` if the partition attribute is missing or holds
    /// a different value
    pub(crate) fn prepare_write(
        &self,
        mut document: Document,
        partition_value: &str,
    ) -> StoreResult<Document> {
        let matches = document
            .get(self.partition_attribute)
            .and_then(|value| value.as_s().ok())
            .is_some_and(|value| value == partition_value);

        if !matches {
            return Err(StoreError::PartitionMismatch {
                attribute: self.partition_attribute.to_string(),
            });
        }

        if self.concurrency_token {
            document.insert(
                CONCURRENCY_TOKEN_ATTRIBUTE.to_string(),
                AttributeValue::S(uuid::Uuid::new_v4().to_string()),
            );
        }

        Ok(document)
    }
}

/// Record filter applied by `query_records`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every record in scope
    All,
    /// Records whose string attribute equals a value
    Equals {
        /// Attribute name
        attribute: &'static str,
        /// Expected value
        value: String,
    },
}

impl Filter {
    /// Builds an equality filter
    #[must_use]
    pub fn equals(attribute: &'static str, value: impl Into<String>) -> Self {
        Self::Equals {
            attribute,
            value: value.into(),
        }
    }

    /// Evaluates the filter against a document
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Equals { attribute, value } => document
                .get(*attribute)
                .and_then(|v| v.as_s().ok())
                .is_some_and(|v| v == value),
        }
    }
}

/// Result of inserting a new record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome<T> {
    /// The record was stored
    Created(T),
    /// A record with the same identifier already exists in the partition
    Conflict,
}

/// Converts a record into a store document
pub(crate) fn to_document<T: Serialize>(record: &T) -> StoreResult<Document> {
    Ok(serde_dynamo::to_item(record)?)
}

/// Converts a store document back into a record
pub(crate) fn from_document<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(serde_dynamo::from_item(document)?)
}

/// Point and range access to a remote partitioned document collection
///
/// Implementations perform no retries of their own and keep no per-request mutable state,
/// so a single instance is shared by all requests.
#[async_trait]
pub trait PartitionedStore: Send + Sync {
    /// Provisions the collection if it does not exist yet
    async fn ensure_collection(&self, collection: &Collection) -> StoreResult<()>;

    /// Stores a new record, reporting a conflict if the identifier is taken in the partition
    async fn create_record(
        &self,
        collection: &Collection,
        document: Document,
        partition_value: &str,
    ) -> StoreResult<CreateOutcome<Document>>;

    /// Reads a record by identifier within a partition
    async fn read_record(
        &self,
        collection: &Collection,
        id: &str,
        partition_value: &str,
    ) -> StoreResult<Option<Document>>;

    /// Inserts or fully replaces a record
    async fn upsert_record(
        &self,
        collection: &Collection,
        document: Document,
        partition_value: &str,
    ) -> StoreResult<Document>;

    /// Removes a record. Removing an absent record succeeds.
    async fn delete_record(
        &self,
        collection: &Collection,
        id: &str,
        partition_value: &str,
    ) -> StoreResult<()>;

    /// Returns every record matching `filter`, draining all result pages
    ///
    /// Without a partition value the query fans out across all partitions, which scans the
    /// whole collection.
    async fn query_records(
        &self,
        collection: &Collection,
        filter: &Filter,
        partition_value: Option<&str>,
    ) -> StoreResult<Vec<Document>>;

    /// Returns the first record matching `filter`
    ///
    /// Stops reading result pages as soon as one holds a match.
    async fn query_first(
        &self,
        collection: &Collection,
        filter: &Filter,
        partition_value: Option<&str>,
    ) -> StoreResult<Option<Document>>;
}
