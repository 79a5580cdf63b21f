use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    EquipmentRequest, InventoryItem, ItemId, ItemQuery, MAX_QUANTITY, RequestId, RequestQuery,
    RequestStatus, Result,
};

/// Outcome of a guarded quantity update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// The delta was applied; `available` is the new lendable quantity.
    Applied { available: u32 },

    /// The guard failed and nothing was written. Carries the values the
    /// guard was evaluated against.
    Rejected { available: u32, provisioned: u32 },
}

impl QuantityUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, QuantityUpdate::Applied { .. })
    }
}

/// Fields written alongside a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub denial_reason: Option<String>,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// A change with no denial reason, stamped now.
    pub fn now() -> Self {
        Self {
            denial_reason: None,
            at: Utc::now(),
        }
    }

    /// A denial carrying `reason`, stamped now.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            denial_reason: Some(reason.into()),
            at: Utc::now(),
        }
    }
}

/// Outcome of a compare-and-set on a request's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTransition {
    /// The request was in the expected status and now holds the new one.
    Applied(EquipmentRequest),

    /// The request was not in the expected status; nothing was written.
    Conflict { actual: RequestStatus },
}

/// Display metadata edits for an item. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetails {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

impl ItemDetails {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Applies the edits to `item` in place.
    pub fn apply_to(&self, item: &mut InventoryItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
    }
}

/// Durable store for inventory items and equipment requests.
///
/// Every method that mutates quantity or status is a single atomic step
/// with respect to other calls on the same record. Implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Inserts a new item. Fails with `Duplicate` if the id is taken.
    async fn insert_item(&self, item: InventoryItem) -> Result<()>;

    /// Retrieves an item by id.
    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>>;

    /// Lists items matching a query, newest first.
    async fn list_items(&self, query: ItemQuery) -> Result<Vec<InventoryItem>>;

    /// Edits an item's display metadata.
    async fn update_item_details(&self, id: ItemId, details: ItemDetails)
    -> Result<InventoryItem>;

    /// Deletes an item and any requests referencing it.
    ///
    /// Returns false if the item did not exist.
    async fn delete_item(&self, id: ItemId) -> Result<bool>;

    /// Adds `delta` to the available quantity if and only if the current
    /// available quantity is at least `expected_min` and the result stays
    /// within `0..=provisioned_quantity`.
    async fn conditional_update_item_quantity(
        &self,
        id: ItemId,
        expected_min: u32,
        delta: i64,
    ) -> Result<QuantityUpdate>;

    /// Moves both provisioned and available quantity by `delta`, unless the
    /// available quantity would become negative.
    async fn adjust_provisioned_quantity(&self, id: ItemId, delta: i64) -> Result<QuantityUpdate>;

    /// Inserts a new request. Fails with `Duplicate` if the id is taken.
    async fn insert_request(&self, request: EquipmentRequest) -> Result<()>;

    /// Retrieves a request by id.
    async fn get_request(&self, id: RequestId) -> Result<Option<EquipmentRequest>>;

    /// Lists requests matching a query, newest first.
    async fn list_requests(&self, query: RequestQuery) -> Result<Vec<EquipmentRequest>>;

    /// Sets the request's status to `new` if it is currently `expected`.
    async fn conditional_update_request_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new: RequestStatus,
        change: StatusChange,
    ) -> Result<StatusTransition>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait InventoryStoreExt: InventoryStore {
    /// Lists requests that still hold or may claim stock of an item.
    async fn open_requests_for_item(&self, id: ItemId) -> Result<Vec<EquipmentRequest>> {
        let requests = self
            .list_requests(RequestQuery::new().item_id(id))
            .await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.status != RequestStatus::Denied)
            .collect())
    }
}

// Blanket implementation for all InventoryStore implementations
impl<T: InventoryStore + ?Sized> InventoryStoreExt for T {}

/// Computes the quantity a guarded update would produce, or `None` if the
/// guard rejects it.
///
/// Shared by backends that evaluate the guard in process.
pub fn guarded_quantity(available: u32, provisioned: u32, expected_min: u32, delta: i64) -> Option<u32> {
    if available < expected_min {
        return None;
    }
    let next = i64::from(available).checked_add(delta)?;
    if next < 0 || next > i64::from(provisioned) {
        return None;
    }
    u32::try_from(next).ok()
}

/// Computes the `(available, provisioned)` pair an administrative stock
/// adjustment would produce, or `None` if either leaves `0..=MAX_QUANTITY`.
pub fn adjusted_quantities(available: u32, provisioned: u32, delta: i64) -> Option<(u32, u32)> {
    let shift = |value: u32| {
        i64::from(value)
            .checked_add(delta)
            .and_then(|next| u32::try_from(next).ok())
            .filter(|next| *next <= MAX_QUANTITY)
    };
    Some((shift(available)?, shift(provisioned)?))
}

/// Returns true if `delta` could move a quantity without leaving
/// `0..=MAX_QUANTITY`. Larger deltas are rejected before reaching SQL.
pub(crate) fn delta_in_range(delta: i64) -> bool {
    delta.unsigned_abs() <= u64::from(MAX_QUANTITY)
}

/// Applies offset then limit to an already ordered list.
pub(crate) fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset.unwrap_or(0));
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}
