use common::ItemId;
use store::{
    InventoryItem, InventoryStore, InventoryStoreExt, ItemDetails, ItemQuery, MAX_QUANTITY,
    QuantityUpdate,
};

use crate::{LedgerError, NewItem, Result};

/// Authoritative owner of per-item available stock.
///
/// `reserve` and `release` are each one guarded update against the store:
/// the check and the write happen as a single step for that item, so two
/// reservations that would jointly overdraw stock cannot both succeed.
/// Locking is scoped per item; reservations on different items never
/// contend.
#[derive(Clone)]
pub struct InventoryLedger<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> InventoryLedger<S> {
    /// Creates a new ledger over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Takes `quantity` units of an item out of available stock.
    ///
    /// Returns the available quantity left after the reservation. Fails with
    /// `InsufficientStock` without writing anything if fewer than `quantity`
    /// units are available. Reserving zero only checks that the item exists.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<u32> {
        if quantity == 0 {
            return self.available(item_id).await;
        }

        let update = self
            .store
            .conditional_update_item_quantity(item_id, quantity, -i64::from(quantity))
            .await?;

        match update {
            QuantityUpdate::Applied { available } => {
                metrics::counter!("ledger_reservations_total", "outcome" => "reserved")
                    .increment(1);
                tracing::info!(%item_id, quantity, available, "stock reserved");
                Ok(available)
            }
            QuantityUpdate::Rejected { available, .. } => {
                metrics::counter!("ledger_reservations_total", "outcome" => "insufficient")
                    .increment(1);
                tracing::warn!(%item_id, quantity, available, "reservation rejected");
                Err(LedgerError::InsufficientStock {
                    item_id,
                    requested: quantity,
                    available,
                })
            }
        }
    }

    /// Returns `quantity` units of an item to available stock.
    ///
    /// Returns the available quantity after the release. Available stock
    /// never rises above the provisioned quantity; a release that would do
    /// so fails with `OverRelease` and changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, item_id: ItemId, quantity: u32) -> Result<u32> {
        if quantity == 0 {
            return self.available(item_id).await;
        }

        let update = self
            .store
            .conditional_update_item_quantity(item_id, 0, i64::from(quantity))
            .await?;

        match update {
            QuantityUpdate::Applied { available } => {
                metrics::counter!("ledger_releases_total").increment(1);
                tracing::info!(%item_id, quantity, available, "stock released");
                Ok(available)
            }
            QuantityUpdate::Rejected {
                available,
                provisioned,
            } => Err(LedgerError::OverRelease {
                item_id,
                quantity,
                available,
                provisioned,
            }),
        }
    }

    /// Adds a new item with all of its stock available.
    #[tracing::instrument(skip(self))]
    pub async fn provision(&self, new_item: NewItem) -> Result<InventoryItem> {
        let item = new_item.into_item()?;
        self.store.insert_item(item.clone()).await?;

        tracing::info!(
            item_id = %item.id,
            quantity = item.provisioned_quantity,
            "item provisioned"
        );
        Ok(item)
    }

    /// Edits an item's name or description. Stock is never touched.
    #[tracing::instrument(skip(self))]
    pub async fn update_details(&self, item_id: ItemId, details: ItemDetails) -> Result<InventoryItem> {
        let name = match details.name {
            Some(name) => match name.trim() {
                "" => return Err(LedgerError::InvalidItem("name cannot be blank".to_string())),
                trimmed => Some(trimmed.to_string()),
            },
            None => None,
        };
        let description = details.description.map(|description| {
            description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
        });

        let details = ItemDetails { name, description };
        Ok(self.store.update_item_details(item_id, details).await?)
    }

    /// Administrative restock or write-off.
    ///
    /// Moves provisioned and available stock together by `delta`. A negative
    /// delta can only write off units that are not currently lent out.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(&self, item_id: ItemId, delta: i64) -> Result<InventoryItem> {
        match self.store.adjust_provisioned_quantity(item_id, delta).await? {
            QuantityUpdate::Applied { available } => {
                tracing::info!(%item_id, delta, available, "stock adjusted");
            }
            QuantityUpdate::Rejected {
                available,
                provisioned,
            } => {
                return Err(LedgerError::InvalidItem(format!(
                    "cannot adjust stock by {delta}: {available} of {provisioned} units are \
                     available and stock is capped at {MAX_QUANTITY}"
                )));
            }
        }
        self.get(item_id).await
    }

    /// Deletes an item together with the requests that reference it.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, item_id: ItemId) -> Result<()> {
        let open = self.store.open_requests_for_item(item_id).await?;
        if !open.is_empty() {
            tracing::warn!(
                %item_id,
                open_requests = open.len(),
                "removing item with pending or approved requests"
            );
        }

        if self.store.delete_item(item_id).await? {
            tracing::info!(%item_id, "item removed");
            Ok(())
        } else {
            Err(LedgerError::ItemNotFound(item_id))
        }
    }

    /// Loads an item.
    pub async fn get(&self, item_id: ItemId) -> Result<InventoryItem> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or(LedgerError::ItemNotFound(item_id))
    }

    /// Lists items matching a query, newest first.
    pub async fn list(&self, query: ItemQuery) -> Result<Vec<InventoryItem>> {
        Ok(self.store.list_items(query).await?)
    }

    async fn available(&self, item_id: ItemId) -> Result<u32> {
        Ok(self.get(item_id).await?.available_quantity)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use store::{BorrowPeriod, EquipmentRequest, InMemoryStore};

    use super::*;

    async fn ledger_with_item(quantity: u32) -> (InventoryLedger<InMemoryStore>, ItemId) {
        let ledger = InventoryLedger::new(InMemoryStore::new());
        let item = ledger
            .provision(NewItem::new("Barricade", quantity))
            .await
            .unwrap();
        (ledger, item.id)
    }

    #[tokio::test]
    async fn reserve_decrements_stock() {
        let (ledger, id) = ledger_with_item(5).await;

        assert_eq!(ledger.reserve(id, 3).await.unwrap(), 2);
        assert_eq!(ledger.get(id).await.unwrap().available_quantity, 2);
    }

    #[tokio::test]
    async fn reserve_beyond_available_fails_without_mutation() {
        let (ledger, id) = ledger_with_item(5).await;
        ledger.reserve(id, 3).await.unwrap();

        let result = ledger.reserve(id, 3).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })
        ));
        assert_eq!(ledger.get(id).await.unwrap().available_quantity, 2);
    }

    #[tokio::test]
    async fn reserve_unknown_item() {
        let ledger = InventoryLedger::new(InMemoryStore::new());
        let id = ItemId::new();

        assert!(matches!(
            ledger.reserve(id, 1).await,
            Err(LedgerError::ItemNotFound(got)) if got == id
        ));
    }

    #[tokio::test]
    async fn zero_quantity_is_a_noop_that_checks_existence() {
        let (ledger, id) = ledger_with_item(4).await;

        assert_eq!(ledger.reserve(id, 0).await.unwrap(), 4);
        assert_eq!(ledger.release(id, 0).await.unwrap(), 4);

        let missing = ItemId::new();
        assert!(matches!(
            ledger.reserve(missing, 0).await,
            Err(LedgerError::ItemNotFound(_))
        ));
        assert!(matches!(
            ledger.release(missing, 0).await,
            Err(LedgerError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn release_restores_reserved_stock() {
        let (ledger, id) = ledger_with_item(5).await;
        ledger.reserve(id, 4).await.unwrap();

        assert_eq!(ledger.release(id, 4).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn release_cannot_exceed_provisioned() {
        let (ledger, id) = ledger_with_item(5).await;
        ledger.reserve(id, 2).await.unwrap();

        let result = ledger.release(id, 3).await;
        assert!(matches!(
            result,
            Err(LedgerError::OverRelease {
                quantity: 3,
                available: 3,
                provisioned: 5,
                ..
            })
        ));
        assert_eq!(ledger.get(id).await.unwrap().available_quantity, 3);
    }

    #[tokio::test]
    async fn provision_requires_a_name() {
        let ledger = InventoryLedger::new(InMemoryStore::new());

        let result = ledger.provision(NewItem::new("", 1)).await;
        assert!(matches!(result, Err(LedgerError::InvalidItem(_))));
        assert_eq!(ledger.store().item_count().await, 0);
    }

    #[tokio::test]
    async fn update_details_leaves_stock_alone() {
        let (ledger, id) = ledger_with_item(5).await;
        ledger.reserve(id, 1).await.unwrap();

        let item = ledger
            .update_details(
                id,
                ItemDetails {
                    name: Some("Crowd barrier".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(item.name, "Crowd barrier");
        assert_eq!(item.available_quantity, 4);

        let blank = ledger
            .update_details(
                id,
                ItemDetails {
                    name: Some(" ".to_string()),
                    description: None,
                },
            )
            .await;
        assert!(matches!(blank, Err(LedgerError::InvalidItem(_))));
    }

    #[tokio::test]
    async fn update_details_trims_what_it_stores() {
        let (ledger, id) = ledger_with_item(1).await;

        let item = ledger
            .update_details(
                id,
                ItemDetails {
                    name: Some("  Crowd barrier ".to_string()),
                    description: Some(Some("  steel ".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(item.name, "Crowd barrier");
        assert_eq!(item.description.as_deref(), Some("steel"));

        let item = ledger
            .update_details(
                id,
                ItemDetails {
                    name: None,
                    description: Some(Some("   ".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(item.name, "Crowd barrier");
        assert!(item.description.is_none());
    }

    #[tokio::test]
    async fn adjust_stock_rejects_overflowing_delta() {
        let (ledger, id) = ledger_with_item(1).await;

        for delta in [i64::MAX, i64::MIN, i64::from(MAX_QUANTITY)] {
            assert!(matches!(
                ledger.adjust_stock(id, delta).await,
                Err(LedgerError::InvalidItem(_))
            ));
        }

        let item = ledger.get(id).await.unwrap();
        assert_eq!(item.available_quantity, 1);
        assert_eq!(item.provisioned_quantity, 1);
    }

    #[tokio::test]
    async fn adjust_stock_only_writes_off_unlent_units() {
        let (ledger, id) = ledger_with_item(5).await;
        ledger.reserve(id, 3).await.unwrap();

        let item = ledger.adjust_stock(id, 4).await.unwrap();
        assert_eq!(item.available_quantity, 6);
        assert_eq!(item.provisioned_quantity, 9);

        let item = ledger.adjust_stock(id, -6).await.unwrap();
        assert_eq!(item.available_quantity, 0);
        assert_eq!(item.provisioned_quantity, 3);
        assert_eq!(item.reserved_quantity(), 3);

        assert!(matches!(
            ledger.adjust_stock(id, -1).await,
            Err(LedgerError::InvalidItem(_))
        ));
    }

    #[tokio::test]
    async fn remove_deletes_item_and_its_requests() {
        let (ledger, id) = ledger_with_item(2).await;
        let item = ledger.get(id).await.unwrap();
        let start = Utc::now();
        let request = EquipmentRequest::pending(
            &item,
            1,
            BorrowPeriod::new(start, start + Duration::days(1)),
            "crew@example.org",
        );
        ledger.store().insert_request(request).await.unwrap();

        ledger.remove(id).await.unwrap();
        assert!(matches!(
            ledger.get(id).await,
            Err(LedgerError::ItemNotFound(_))
        ));
        assert_eq!(ledger.store().request_count().await, 0);

        assert!(matches!(
            ledger.remove(id).await,
            Err(LedgerError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_search() {
        let (ledger, _) = ledger_with_item(1).await;
        ledger
            .provision(NewItem::new("Generator", 2).with_description("Diesel"))
            .await
            .unwrap();

        let found = ledger.list(ItemQuery::new().search("diesel")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Generator");
        assert_eq!(ledger.list(ItemQuery::new()).await.unwrap().len(), 2);
    }
}
