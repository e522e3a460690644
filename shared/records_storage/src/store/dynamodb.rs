//! `DynamoDB` implementation of the partitioned store
//!
//! Each collection maps to a table whose hash key is the partition attribute and whose range
//! key is the record identifier. Partition-scoped queries use `Query`, cross-partition
//! queries use `Scan`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    types::{
        AttributeDefinition, AttributeValue, BillingMode, ConsumedCapacity, KeySchemaElement,
        KeyType, ReturnConsumedCapacity, ScalarAttributeType, TableStatus,
    },
    Client as DynamoDbClient,
};

use super::{
    Collection, CreateOutcome, Document, Filter, PartitionedStore, StoreError, StoreResult,
    DEFAULT_PAGE_SIZE, ID_ATTRIBUTE,
};

/// Capacity units per page above which a partition-scoped query is reported
const PARTITION_QUERY_COST_WARNING: f64 = 10.0;

/// Capacity units per page above which a cross-partition query is reported
const CROSS_PARTITION_QUERY_COST_WARNING: f64 = 15.0;

/// How many times to poll a freshly created table before giving up on it becoming active
const TABLE_ACTIVE_POLL_ATTEMPTS: u32 = 30;

/// Store client backed by `DynamoDB`
pub struct DynamoDbStore {
    dynamodb_client: Arc<DynamoDbClient>,
    page_size: i32,
}

impl DynamoDbStore {
    /// Creates a new store client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured `DynamoDB` client, including its retry policy
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>) -> Self {
        Self {
            dynamodb_client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the number of records fetched per query page
    #[must_use]
    pub const fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    fn key(collection: &Collection, id: &str, partition_value: &str) -> Document {
        Document::from([
            (
                collection.partition_attribute().to_string(),
                AttributeValue::S(partition_value.to_string()),
            ),
            (ID_ATTRIBUTE.to_string(), AttributeValue::S(id.to_string())),
        ])
    }

    async fn create_table(&self, collection: &Collection) -> StoreResult<()> {
        let attribute = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| StoreError::Backend(e.to_string()))
        };
        let key = |name: &str, key_type: KeyType| {
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
                .map_err(|e| StoreError::Backend(e.to_string()))
        };

        let result = self
            .dynamodb_client
            .create_table()
            .table_name(collection.name())
            .billing_mode(BillingMode::PayPerRequest)
            .attribute_definitions(attribute(collection.partition_attribute())?)
            .attribute_definitions(attribute(ID_ATTRIBUTE)?)
            .key_schema(key(collection.partition_attribute(), KeyType::Hash)?)
            .key_schema(key(ID_ATTRIBUTE, KeyType::Range)?)
            .send()
            .await;

        match result {
            Ok(_) => {}
            // Another instance created it first
            Err(SdkError::ServiceError(ref svc)) if svc.err().is_resource_in_use_exception() => {}
            Err(err) => return Err(StoreError::from_sdk(err)),
        }

        for _ in 0..TABLE_ACTIVE_POLL_ATTEMPTS {
            let output = self
                .dynamodb_client
                .describe_table()
                .table_name(collection.name())
                .send()
                .await
                .map_err(StoreError::from_sdk)?;

            let status = output.table().and_then(|table| table.table_status());
            if status == Some(&TableStatus::Active) {
                return Ok(());
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        Err(StoreError::Backend(format!(
            "Table {} did not become active",
            collection.name()
        )))
    }

    /// Reads result pages in order, stopping after the first page with a match when
    /// `first_only` is set
    async fn read_pages(
        &self,
        collection: &Collection,
        filter: &Filter,
        partition_value: Option<&str>,
        first_only: bool,
    ) -> StoreResult<Vec<Document>> {
        let filter = FilterExpression::render(filter);
        let mut documents = Vec::new();

        if let Some(partition_value) = partition_value {
            let mut request = self
                .dynamodb_client
                .query()
                .table_name(collection.name())
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", collection.partition_attribute())
                .expression_attribute_values(":pk", AttributeValue::S(partition_value.to_string()))
                .return_consumed_capacity(ReturnConsumedCapacity::Total);

            if let Some(filter) = filter {
                request = request
                    .filter_expression(filter.expression)
                    .expression_attribute_names(filter.attribute_name.0, filter.attribute_name.1)
                    .expression_attribute_values(filter.attribute_value.0, filter.attribute_value.1);
            }

            let mut pages = request.into_paginator().page_size(self.page_size).send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(StoreError::from_sdk)?;

                let units = observe_cost("query_records", collection, page.consumed_capacity());
                if units > PARTITION_QUERY_COST_WARNING {
                    tracing::warn!(
                        collection = collection.name(),
                        partition_value,
                        capacity_units = units,
                        "High capacity consumption on partition query"
                    );
                }

                documents.extend(page.items.unwrap_or_default());
                if first_only && !documents.is_empty() {
                    break;
                }
            }
        } else {
            tracing::debug!(
                collection = collection.name(),
                "Running cross-partition scan"
            );

            let mut request = self
                .dynamodb_client
                .scan()
                .table_name(collection.name())
                .return_consumed_capacity(ReturnConsumedCapacity::Total);

            if let Some(filter) = filter {
                request = request
                    .filter_expression(filter.expression)
                    .expression_attribute_names(filter.attribute_name.0, filter.attribute_name.1)
                    .expression_attribute_values(filter.attribute_value.0, filter.attribute_value.1);
            }

            let mut pages = request.into_paginator().page_size(self.page_size).send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(StoreError::from_sdk)?;

                let units = observe_cost("query_records", collection, page.consumed_capacity());
                if units > CROSS_PARTITION_QUERY_COST_WARNING {
                    tracing::warn!(
                        collection = collection.name(),
                        capacity_units = units,
                        "High capacity consumption on cross-partition query"
                    );
                }

                documents.extend(page.items.unwrap_or_default());
                if first_only && !documents.is_empty() {
                    break;
                }
            }
        }

        Ok(documents)
    }
}

/// Logs the capacity consumed by a request and returns it
fn observe_cost(
    operation: &'static str,
    collection: &Collection,
    capacity: Option<&ConsumedCapacity>,
) -> f64 {
    let units = capacity
        .and_then(ConsumedCapacity::capacity_units)
        .unwrap_or_default();

    tracing::debug!(
        operation,
        collection = collection.name(),
        capacity_units = units,
        "Store request completed"
    );

    units
}

/// Filter rendered into `DynamoDB` expression syntax
#[derive(Debug, PartialEq)]
struct FilterExpression {
    expression: &'static str,
    attribute_name: (&'static str, &'static str),
    attribute_value: (&'static str, AttributeValue),
}

impl FilterExpression {
    fn render(filter: &Filter) -> Option<Self> {
        match filter {
            Filter::All => None,
            Filter::Equals { attribute, value } => Some(Self {
                expression: "#filter = :filter",
                attribute_name: ("#filter", *attribute),
                attribute_value: (":filter", AttributeValue::S(value.clone())),
            }),
        }
    }
}

#[async_trait]
impl PartitionedStore for DynamoDbStore {
    async fn ensure_collection(&self, collection: &Collection) -> StoreResult<()> {
        let Err(err) = self
            .dynamodb_client
            .describe_table()
            .table_name(collection.name())
            .send()
            .await
        else {
            return Ok(());
        };

        if !matches!(
            err,
            SdkError::ServiceError(ref svc) if svc.err().is_resource_not_found_exception()
        ) {
            return Err(StoreError::from_sdk(err));
        }

        tracing::info!(
            collection = collection.name(),
            partition_attribute = collection.partition_attribute(),
            "Creating missing table"
        );
        self.create_table(collection).await
    }

    async fn create_record(
        &self,
        collection: &Collection,
        document: Document,
        partition_value: &str,
    ) -> StoreResult<CreateOutcome<Document>> {
        let document = collection.prepare_write(document, partition_value)?;

        // Create only if no record with this partition value + id exists
        let result = self
            .dynamodb_client
            .put_item()
            .table_name(collection.name())
            .set_item(Some(document.clone()))
            .condition_expression("attribute_not_exists(#pk) AND attribute_not_exists(#sk)")
            .expression_attribute_names("#pk", collection.partition_attribute())
            .expression_attribute_names("#sk", ID_ATTRIBUTE)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await;

        match result {
            Ok(output) => {
                observe_cost("create_record", collection, output.consumed_capacity());
                Ok(CreateOutcome::Created(document))
            }
            Err(SdkError::ServiceError(ref svc))
                if svc.err().is_conditional_check_failed_exception() =>
            {
                Ok(CreateOutcome::Conflict)
            }
            Err(err) => Err(StoreError::from_sdk(err)),
        }
    }

    async fn read_record(
        &self,
        collection: &Collection,
        id: &str,
        partition_value: &str,
    ) -> StoreResult<Option<Document>> {
        let output = self
            .dynamodb_client
            .get_item()
            .table_name(collection.name())
            .set_key(Some(Self::key(collection, id, partition_value)))
            .consistent_read(true)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(StoreError::from_sdk)?;

        observe_cost("read_record", collection, output.consumed_capacity());

        Ok(output.item)
    }

    async fn upsert_record(
        &self,
        collection: &Collection,
        document: Document,
        partition_value: &str,
    ) -> StoreResult<Document> {
        let document = collection.prepare_write(document, partition_value)?;

        let output = self
            .dynamodb_client
            .put_item()
            .table_name(collection.name())
            .set_item(Some(document.clone()))
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(StoreError::from_sdk)?;

        observe_cost("upsert_record", collection, output.consumed_capacity());

        Ok(document)
    }

    async fn delete_record(
        &self,
        collection: &Collection,
        id: &str,
        partition_value: &str,
    ) -> StoreResult<()> {
        // Deleting a missing key is not an error in DynamoDB
        let output = self
            .dynamodb_client
            .delete_item()
            .table_name(collection.name())
            .set_key(Some(Self::key(collection, id, partition_value)))
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(StoreError::from_sdk)?;

        observe_cost("delete_record", collection, output.consumed_capacity());

        Ok(())
    }

    async fn query_records(
        &self,
        collection: &Collection,
        filter: &Filter,
        partition_value: Option<&str>,
    ) -> StoreResult<Vec<Document>> {
        self.read_pages(collection, filter, partition_value, false)
            .await
    }

    async fn query_first(
        &self,
        collection: &Collection,
        filter: &Filter,
        partition_value: Option<&str>,
    ) -> StoreResult<Option<Document>> {
        let documents = self
            .read_pages(collection, filter, partition_value, true)
            .await?;

        Ok(documents.into_iter().next())
    }
}
