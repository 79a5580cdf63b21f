//! Inventory administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::ItemId;
use ledger::NewItem;
use serde::{Deserialize, Serialize};
use store::{InventoryItem, InventoryStore, ItemDetails, ItemQuery};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListItemsParams {
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    /// An empty string clears the description.
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub available_quantity: u32,
    pub provisioned_quantity: u32,
    pub reserved_quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InventoryItem> for ItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.id.to_string(),
            reserved_quantity: item.reserved_quantity(),
            name: item.name,
            description: item.description,
            available_quantity: item.available_quantity,
            provisioned_quantity: item.provisioned_quantity,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

// -- Handlers --

/// GET /inventory: list items, optionally filtered by a search term.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let mut query = ItemQuery::new();
    if let Some(search) = params.search {
        query = query.search(search);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let items = state.ledger.list(query).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// POST /inventory: provision a new item.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let quantity = u32::try_from(req.quantity).map_err(|_| {
        ApiError::BadRequest(format!(
            "Quantity must be a non-negative integer, got {}",
            req.quantity
        ))
    })?;

    let item = state
        .ledger
        .provision(NewItem {
            name: req.name,
            description: req.description,
            quantity,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// GET /inventory/:id: load an item.
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_item_id(&id)?;
    let item = state.ledger.get(item_id).await?;
    Ok(Json(item.into()))
}

/// PUT /inventory/:id: edit display metadata.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_item_id(&id)?;
    let details = ItemDetails {
        name: req.name,
        description: req.description.map(Some),
    };

    let item = if details.is_empty() {
        state.ledger.get(item_id).await?
    } else {
        state.ledger.update_details(item_id, details).await?
    };
    Ok(Json(item.into()))
}

/// POST /inventory/:id/stock: restock or write off units.
#[tracing::instrument(skip(state))]
pub async fn adjust_stock<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_item_id(&id)?;
    let item = state.ledger.adjust_stock(item_id, req.delta).await?;
    Ok(Json(item.into()))
}

/// DELETE /inventory/:id: remove an item and its requests.
#[tracing::instrument(skip(state))]
pub async fn remove<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item_id = parse_item_id(&id)?;
    state.ledger.remove(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn parse_item_id(id: &str) -> Result<ItemId, ApiError> {
    ItemId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid item id: {e}")))
}
