//! In-memory partitioned store used by tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{
    Collection, CreateOutcome, Document, Filter, PartitionedStore, StoreError, StoreResult,
};

/// (collection, partition value, id)
type RecordKey = (String, String, String);

/// Partitioned store holding records in process memory
///
/// Follows the same contract as [`super::DynamoDbStore`]: records are addressed by partition
/// value and identifier, creates conflict on a taken identifier and deletes are idempotent.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordKey, Document>>,
    /// Calls still allowed to succeed, and the error returned by the one after them
    injected_failure: Mutex<Option<(usize, StoreError)>>,
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next store call fail with `error`
    pub async fn fail_next(&self, error: StoreError) {
        self.fail_after(0, error).await;
    }

    /// Lets `calls` store calls succeed, then makes the following one fail with `error`
    pub async fn fail_after(&self, calls: usize, error: StoreError) {
        *self.injected_failure.lock().await = Some((calls, error));
    }

    /// Number of records held across all collections
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn take_failure(&self) -> StoreResult<()> {
        let mut injected = self.injected_failure.lock().await;
        if let Some((remaining, _)) = injected.as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(());
            }
        }

        injected.take().map_or(Ok(()), |(_, error)| Err(error))
    }

    fn record_key(collection: &Collection, id: &str, partition_value: &str) -> RecordKey {
        (
            collection.name().to_string(),
            partition_value.to_string(),
            id.to_string(),
        )
    }

    fn document_id(document: &Document) -> StoreResult<String> {
        document
            .get(super::ID_ATTRIBUTE)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .ok_or_else(|| StoreError::SerializationError("record has no id".to_string()))
    }
}

#[async_trait]
impl PartitionedStore for MemoryStore {
    async fn ensure_collection(&self, _collection: &Collection) -> StoreResult<()> {
        self.take_failure().await
    }

    async fn create_record(
        &self,
        collection: &Collection,
        document: Document,
        partition_value: &str,
    ) -> StoreResult<CreateOutcome<Document>> {
        self.take_failure().await?;
        let document = collection.prepare_write(document, partition_value)?;
        let key = Self::record_key(collection, &Self::document_id(&document)?, partition_value);

        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Ok(CreateOutcome::Conflict);
        }
        records.insert(key, document.clone());

        Ok(CreateOutcome::Created(document))
    }

    async fn read_record(
        &self,
        collection: &Collection,
        id: &str,
        partition_value: &str,
    ) -> StoreResult<Option<Document>> {
        self.take_failure().await?;
        let key = Self::record_key(collection, id, partition_value);

        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn upsert_record(
        &self,
        collection: &Collection,
        document: Document,
        partition_value: &str,
    ) -> StoreResult<Document> {
        self.take_failure().await?;
        let document = collection.prepare_write(document, partition_value)?;
        let key = Self::record_key(collection, &Self::document_id(&document)?, partition_value);

        self.records.write().await.insert(key, document.clone());

        Ok(document)
    }

    async fn delete_record(
        &self,
        collection: &Collection,
        id: &str,
        partition_value: &str,
    ) -> StoreResult<()> {
        self.take_failure().await?;
        let key = Self::record_key(collection, id, partition_value);

        self.records.write().await.remove(&key);

        Ok(())
    }

    async fn query_records(
        &self,
        collection: &Collection,
        filter: &Filter,
        partition_value: Option<&str>,
    ) -> StoreResult<Vec<Document>> {
        self.take_failure().await?;
        let records = self.records.read().await;

        Ok(records
            .iter()
            .filter(|((name, partition, _), _)| {
                name == collection.name()
                    && partition_value.is_none_or(|value| value == partition.as_str())
            })
            .map(|(_, document)| document)
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn query_first(
        &self,
        collection: &Collection,
        filter: &Filter,
        partition_value: Option<&str>,
    ) -> StoreResult<Option<Document>> {
        let documents = self
            .query_records(collection, filter, partition_value)
            .await?;

        Ok(documents.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aws_sdk_dynamodb::types::AttributeValue;

    use super::*;

    fn collection() -> Collection {
        Collection::new("items".to_string(), "userId")
    }

    fn document(id: &str, user_id: &str) -> Document {
        HashMap::from([
            ("id".to_string(), AttributeValue::S(id.to_string())),
            ("userId".to_string(), AttributeValue::S(user_id.to_string())),
        ])
    }

    #[tokio::test]
    async fn test_create_conflicts_only_within_partition() {
        let store = MemoryStore::new();

        let first = store
            .create_record(&collection(), document("1", "u1"), "u1")
            .await
            .unwrap();
        let same_partition = store
            .create_record(&collection(), document("1", "u1"), "u1")
            .await
            .unwrap();
        let other_partition = store
            .create_record(&collection(), document("1", "u2"), "u2")
            .await
            .unwrap();

        assert!(matches!(first, CreateOutcome::Created(_)));
        assert_eq!(same_partition, CreateOutcome::Conflict);
        assert!(matches!(other_partition, CreateOutcome::Created(_)));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        store
            .fail_next(StoreError::Throttled { retry_after: None })
            .await;

        let first = store.read_record(&collection(), "1", "u1").await;
        let second = store.read_record(&collection(), "1", "u1").await;

        assert!(matches!(first, Err(StoreError::Throttled { .. })));
        assert!(matches!(second, Ok(None)));
    }

    #[tokio::test]
    async fn test_query_first_returns_single_match() {
        let store = MemoryStore::new();
        for (id, user_id) in [("1", "u1"), ("2", "u2"), ("3", "u2")] {
            store
                .create_record(&collection(), document(id, user_id), user_id)
                .await
                .unwrap();
        }

        let found = store
            .query_first(&collection(), &Filter::equals("userId", "u2"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("userId"), Some(&AttributeValue::S("u2".to_string())));

        let missing = store
            .query_first(&collection(), &Filter::equals("userId", "u3"), None)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_after_calls() {
        let store = MemoryStore::new();
        store
            .fail_after(2, StoreError::Backend("boom".to_string()))
            .await;

        assert!(store.read_record(&collection(), "1", "u1").await.is_ok());
        assert!(store.delete_record(&collection(), "1", "u1").await.is_ok());
        assert!(matches!(
            store.read_record(&collection(), "1", "u1").await,
            Err(StoreError::Backend(_))
        ));
        assert!(store.read_record(&collection(), "1", "u1").await.is_ok());
    }
}
