use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{
    EquipmentRequest, InventoryItem, ItemId, ItemQuery, RequestId, RequestQuery, RequestStatus,
    Result, StoreError,
    store::{
        InventoryStore, ItemDetails, QuantityUpdate, StatusChange, StatusTransition,
        adjusted_quantities, guarded_quantity, paginate,
    },
};

/// A record guarded by its own lock.
type Cell<T> = Arc<Mutex<T>>;

#[derive(Debug, Default)]
struct Faults {
    fail_on_status_update: AtomicBool,
    status_update_delay_ms: AtomicU64,
}

/// In-memory store implementation for tests and single-process deployments.
///
/// Each item and request sits behind its own mutex. The surrounding maps are
/// only write-locked for inserts and deletes, so guarded updates on
/// different records never contend.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    items: Arc<RwLock<HashMap<ItemId, Cell<InventoryItem>>>>,
    requests: Arc<RwLock<HashMap<RequestId, Cell<EquipmentRequest>>>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent status update fail with `Unavailable`.
    pub fn set_fail_on_status_update(&self, fail: bool) {
        self.faults
            .fail_on_status_update
            .store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent status update wait `delay` before it takes the
    /// request's lock. Zero turns the delay off.
    pub fn set_status_update_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.faults
            .status_update_delay_ms
            .store(millis, Ordering::SeqCst);
    }

    /// Returns the number of stored items.
    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }

    /// Returns the number of stored requests.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    async fn item_cell(&self, id: ItemId) -> Option<Cell<InventoryItem>> {
        self.items.read().await.get(&id).cloned()
    }

    async fn request_cell(&self, id: RequestId) -> Option<Cell<EquipmentRequest>> {
        self.requests.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn insert_item(&self, item: InventoryItem) -> Result<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(StoreError::Duplicate(format!("inventory item {}", item.id)));
        }
        items.insert(item.id, Arc::new(Mutex::new(item)));
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<InventoryItem>> {
        match self.item_cell(id).await {
            Some(cell) => Ok(Some(cell.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_items(&self, query: ItemQuery) -> Result<Vec<InventoryItem>> {
        let cells: Vec<_> = self.items.read().await.values().cloned().collect();

        let mut items = Vec::with_capacity(cells.len());
        for cell in cells {
            let item = cell.lock().await;
            if query.matches(&item) {
                items.push(item.clone());
            }
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(paginate(items, query.offset, query.limit))
    }

    async fn update_item_details(
        &self,
        id: ItemId,
        details: ItemDetails,
    ) -> Result<InventoryItem> {
        let cell = self
            .item_cell(id)
            .await
            .ok_or(StoreError::ItemNotFound(id))?;

        let mut item = cell.lock().await;
        details.apply_to(&mut item);
        item.updated_at = chrono::Utc::now();
        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let removed = self.items.write().await.remove(&id).is_some();
        if !removed {
            return Ok(false);
        }

        // Mirror the cascading foreign key of the relational schema.
        let mut requests = self.requests.write().await;
        let mut doomed = Vec::new();
        for (request_id, cell) in requests.iter() {
            if cell.lock().await.item_id == id {
                doomed.push(*request_id);
            }
        }
        for request_id in doomed {
            requests.remove(&request_id);
        }

        Ok(true)
    }

    async fn conditional_update_item_quantity(
        &self,
        id: ItemId,
        expected_min: u32,
        delta: i64,
    ) -> Result<QuantityUpdate> {
        let cell = self
            .item_cell(id)
            .await
            .ok_or(StoreError::ItemNotFound(id))?;

        let mut item = cell.lock().await;
        match guarded_quantity(
            item.available_quantity,
            item.provisioned_quantity,
            expected_min,
            delta,
        ) {
            Some(available) => {
                item.available_quantity = available;
                item.updated_at = chrono::Utc::now();
                Ok(QuantityUpdate::Applied { available })
            }
            None => Ok(QuantityUpdate::Rejected {
                available: item.available_quantity,
                provisioned: item.provisioned_quantity,
            }),
        }
    }

    async fn adjust_provisioned_quantity(&self, id: ItemId, delta: i64) -> Result<QuantityUpdate> {
        let cell = self
            .item_cell(id)
            .await
            .ok_or(StoreError::ItemNotFound(id))?;

        let mut item = cell.lock().await;
        match adjusted_quantities(item.available_quantity, item.provisioned_quantity, delta) {
            Some((available, provisioned)) => {
                item.available_quantity = available;
                item.provisioned_quantity = provisioned;
                item.updated_at = chrono::Utc::now();
                Ok(QuantityUpdate::Applied { available })
            }
            None => Ok(QuantityUpdate::Rejected {
                available: item.available_quantity,
                provisioned: item.provisioned_quantity,
            }),
        }
    }

    async fn insert_request(&self, request: EquipmentRequest) -> Result<()> {
        // Held until the insert lands so a concurrent delete cannot orphan it.
        let items = self.items.read().await;
        if !items.contains_key(&request.item_id) {
            return Err(StoreError::ItemNotFound(request.item_id));
        }

        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(StoreError::Duplicate(format!(
                "equipment request {}",
                request.id
            )));
        }
        requests.insert(request.id, Arc::new(Mutex::new(request)));
        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<EquipmentRequest>> {
        match self.request_cell(id).await {
            Some(cell) => Ok(Some(cell.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_requests(&self, query: RequestQuery) -> Result<Vec<EquipmentRequest>> {
        let cells: Vec<_> = self.requests.read().await.values().cloned().collect();

        let mut requests = Vec::with_capacity(cells.len());
        for cell in cells {
            let request = cell.lock().await;
            if query.matches(&request) {
                requests.push(request.clone());
            }
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(paginate(requests, query.offset, query.limit))
    }

    async fn conditional_update_request_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new: RequestStatus,
        change: StatusChange,
    ) -> Result<StatusTransition> {
        let delay = self.faults.status_update_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.faults.fail_on_status_update.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "status update rejected by fault injection".to_string(),
            ));
        }

        let cell = self
            .request_cell(id)
            .await
            .ok_or(StoreError::RequestNotFound(id))?;

        let mut request = cell.lock().await;
        if request.status != expected {
            return Ok(StatusTransition::Conflict {
                actual: request.status,
            });
        }

        request.status = new;
        request.denial_reason = change.denial_reason;
        request.updated_at = change.at;
        Ok(StatusTransition::Applied(request.clone()))
    }
}
