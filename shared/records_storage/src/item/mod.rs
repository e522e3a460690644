//! Item storage, partitioned by owner

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::error::RepositoryResult;
use crate::store::{
    from_document, to_document, Collection, CreateOutcome, Filter, PartitionedStore,
};

/// Item record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique item ID (UUID v4)
    pub id: String,
    /// Owner of the item (partition attribute)
    pub user_id: String,
    /// Item name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Item category
    pub category: String,
    /// Creation timestamp, never changed after insert
    pub created_at: DateTime<Utc>,
}

/// Request to create a new item
#[derive(Debug, Clone)]
pub struct ItemCreateRequest {
    /// Owner of the item
    pub user_id: String,
    /// Item name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Item category
    pub category: String,
}

/// Attribute names of item records
#[derive(Debug, Clone, Copy, Display, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum ItemAttribute {
    /// Item ID
    Id,
    /// Owner (partition attribute)
    UserId,
    /// Item name
    Name,
    /// Description
    Description,
    /// Category
    Category,
    /// Creation timestamp
    CreatedAt,
}

/// Repository for items
pub struct ItemRepository {
    store: Arc<dyn PartitionedStore>,
    collection: Collection,
}

impl ItemRepository {
    /// Creates a new repository
    ///
    /// # Arguments
    ///
    /// * `store` - Shared store client
    /// * `table_name` - Name of the items collection
    #[must_use]
    pub fn new(store: Arc<dyn PartitionedStore>, table_name: String) -> Self {
        Self {
            store,
            collection: Collection::new(table_name, ItemAttribute::UserId.into()),
        }
    }

    /// Collection the repository reads and writes
    #[must_use]
    pub const fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Creates a new item with a generated ID and creation timestamp
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip_all, fields(user_id = %request.user_id))]
    pub async fn create(&self, request: ItemCreateRequest) -> RepositoryResult<CreateOutcome<Item>> {
        let item = Item {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id,
            name: request.name,
            description: request.description,
            category: request.category,
            created_at: Utc::now(),
        };

        let outcome = self
            .store
            .create_record(&self.collection, to_document(&item)?, &item.user_id)
            .await?;

        match outcome {
            CreateOutcome::Created(document) => {
                let item: Item = from_document(document)?;
                tracing::info!(item_id = %item.id, "Item created");
                Ok(CreateOutcome::Created(item))
            }
            CreateOutcome::Conflict => {
                tracing::warn!(item_id = %item.id, "Item ID already taken in partition");
                Ok(CreateOutcome::Conflict)
            }
        }
    }

    /// Gets a single item by ID within the owner's partition
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str, user_id: &str) -> RepositoryResult<Option<Item>> {
        let document = self.store.read_record(&self.collection, id, user_id).await?;

        Ok(document.map(from_document::<Item>).transpose()?)
    }

    /// Lists all items of an owner, newest first
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: &str) -> RepositoryResult<Vec<Item>> {
        let documents = self
            .store
            .query_records(&self.collection, &Filter::All, Some(user_id))
            .await?;

        let mut items = documents
            .into_iter()
            .map(from_document)
            .collect::<Result<Vec<Item>, _>>()?;
        items.sort_by_key(|item| std::cmp::Reverse(item.created_at));

        Ok(items)
    }

    /// Replaces an item with the given state
    ///
    /// No fields are merged; the caller supplies the complete record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip_all, fields(item_id = %item.id, user_id = %item.user_id))]
    pub async fn update(&self, item: &Item) -> RepositoryResult<Item> {
        let document = self
            .store
            .upsert_record(&self.collection, to_document(item)?, &item.user_id)
            .await?;

        Ok(from_document(document)?)
    }

    /// Deletes an item. Deleting a missing item succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str, user_id: &str) -> RepositoryResult<()> {
        self.store
            .delete_record(&self.collection, id, user_id)
            .await?;

        Ok(())
    }
}
