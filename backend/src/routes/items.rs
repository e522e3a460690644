use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use records_storage::{
    item::{Item, ItemCreateRequest, ItemRepository},
    store::CreateOutcome,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{AppError, Created, NoContent, ValidatedJson};

use super::not_blank;

/// Request to create a new item
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Owner of the item
    #[validate(length(min = 1), custom(function = "not_blank"))]
    pub user_id: String,

    /// Name of the item
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,

    /// Free-form description
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,

    /// Category of the item
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub category: String,
}

/// Request to replace the mutable fields of an item
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    /// Name of the item
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,

    /// Free-form description
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,

    /// Category of the item
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub category: String,
}

/// Item as returned by the API
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    /// Unique ID of the item
    pub id: String,
    /// Owner of the item
    pub user_id: String,
    /// Name of the item
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Category of the item
    pub category: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            user_id: item.user_id,
            name: item.name,
            description: item.description,
            category: item.category,
            created_at: item.created_at,
        }
    }
}

/// Path addressing the items of one owner
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPath {
    /// Owner of the items
    pub user_id: String,
}

/// Path addressing a single item
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPath {
    /// Owner of the item
    pub user_id: String,
    /// Unique ID of the item
    pub id: String,
}

/// List the items of an owner
///
/// Returns `200 OK` with the owner's items, newest first. An owner without items
/// gets an empty list.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn list_items(
    Extension(item_repository): Extension<Arc<ItemRepository>>,
    Path(path): Path<UserPath>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = item_repository.list_by_user(&path.user_id).await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// Get an item
///
/// # Errors
///
/// - `404 NOT_FOUND` - No item with this ID belongs to the owner
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn get_item(
    Extension(item_repository): Extension<Arc<ItemRepository>>,
    Path(path): Path<ItemPath>,
) -> Result<Json<ItemResponse>, AppError> {
    let item = item_repository
        .get_by_id(&path.id, &path.user_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(item.into()))
}

/// Create a new item
///
/// Generates the item ID and creation timestamp.
///
/// # Returns
///
/// Returns `201 CREATED` with the stored item and a `Location` header on success
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid request body
/// - `409 CONFLICT` - Generated ID is already taken for the owner
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn create_item(
    Extension(item_repository): Extension<Arc<ItemRepository>>,
    ValidatedJson(payload): ValidatedJson<CreateItemRequest>,
) -> Result<Created<ItemResponse>, AppError> {
    let create_request = ItemCreateRequest {
        user_id: payload.user_id,
        name: payload.name,
        description: payload.description,
        category: payload.category,
    };

    match item_repository.create(create_request).await? {
        CreateOutcome::Created(item) => {
            let location = ["api", "items", item.user_id.as_str(), item.id.as_str()];
            Ok(Created::at(&location, ItemResponse::from(item.clone())))
        }
        CreateOutcome::Conflict => Err(AppError::new(
            StatusCode::CONFLICT,
            "item_exists",
            "Item already exists",
            true,
        )),
    }
}

/// Update an item
///
/// Replaces the name, description and category. The owner, ID and creation timestamp
/// never change.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid request body
/// - `404 NOT_FOUND` - No item with this ID belongs to the owner
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn update_item(
    Extension(item_repository): Extension<Arc<ItemRepository>>,
    Path(path): Path<ItemPath>,
    ValidatedJson(payload): ValidatedJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    let mut item = item_repository
        .get_by_id(&path.id, &path.user_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    item.name = payload.name;
    item.description = payload.description;
    item.category = payload.category;

    let item = item_repository.update(&item).await?;

    Ok(Json(item.into()))
}

/// Delete an item
///
/// Deleting an item that does not exist also succeeds.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn delete_item(
    Extension(item_repository): Extension<Arc<ItemRepository>>,
    Path(path): Path<ItemPath>,
) -> Result<NoContent, AppError> {
    item_repository.delete(&path.id, &path.user_id).await?;

    Ok(NoContent)
}
