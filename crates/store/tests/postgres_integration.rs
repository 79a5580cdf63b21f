//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    BorrowPeriod, EquipmentRequest, InventoryItem, InventoryStore, ItemDetails, ItemId, ItemQuery,
    MAX_QUANTITY, PostgresStore, QuantityUpdate, RequestId, RequestQuery, RequestStatus,
    StatusChange, StatusTransition, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE equipment_request, inventory_item")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn period() -> BorrowPeriod {
    let start = Utc::now();
    BorrowPeriod::new(start, start + Duration::days(3))
}

async fn seeded_item(store: &PostgresStore, quantity: u32) -> InventoryItem {
    let item = InventoryItem::new("Road barrier", Some("Orange, 2m".to_string()), quantity);
    store.insert_item(item.clone()).await.unwrap();
    item
}

#[tokio::test]
#[serial]
async fn insert_and_get_item() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 4).await;

    let loaded = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Road barrier");
    assert_eq!(loaded.available_quantity, 4);
    assert_eq!(loaded.provisioned_quantity, 4);

    assert!(store.get_item(ItemId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_item_is_rejected() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 1).await;

    let result = store.insert_item(item).await;
    assert!(matches!(result, Err(StoreError::Duplicate(_))));
}

#[tokio::test]
#[serial]
async fn guarded_decrement_never_overdraws() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 5).await;

    let first = store
        .conditional_update_item_quantity(item.id, 3, -3)
        .await
        .unwrap();
    assert_eq!(first, QuantityUpdate::Applied { available: 2 });

    let second = store
        .conditional_update_item_quantity(item.id, 3, -3)
        .await
        .unwrap();
    assert_eq!(
        second,
        QuantityUpdate::Rejected {
            available: 2,
            provisioned: 5
        }
    );
}

#[tokio::test]
#[serial]
async fn guarded_increment_stops_at_provisioned() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 2).await;

    let update = store
        .conditional_update_item_quantity(item.id, 0, 1)
        .await
        .unwrap();
    assert!(!update.is_applied());

    let loaded = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded.available_quantity, 2);
}

#[tokio::test]
#[serial]
async fn guarded_update_on_missing_item() {
    let store = get_test_store().await;

    let result = store
        .conditional_update_item_quantity(ItemId::new(), 0, -1)
        .await;
    assert!(matches!(result, Err(StoreError::ItemNotFound(_))));
}

#[tokio::test]
#[serial]
async fn concurrent_decrements_are_linearizable() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 10).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .conditional_update_item_quantity(item.id, 3, -3)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let outcomes = futures_util::future::join_all(handles).await;
    let applied = outcomes
        .into_iter()
        .map(|r| r.unwrap())
        .filter(QuantityUpdate::is_applied)
        .count();
    assert_eq!(applied, 3);

    let loaded = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded.available_quantity, 1);
}

#[tokio::test]
#[serial]
async fn adjust_provisioned_quantity() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 3).await;

    let update = store.adjust_provisioned_quantity(item.id, 2).await.unwrap();
    assert_eq!(update, QuantityUpdate::Applied { available: 5 });

    let update = store.adjust_provisioned_quantity(item.id, -6).await.unwrap();
    assert!(!update.is_applied());

    let loaded = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded.provisioned_quantity, 5);
}

#[tokio::test]
#[serial]
async fn quantity_updates_reject_out_of_range_deltas() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 1).await;

    for delta in [i64::MAX, i64::MIN, i64::from(MAX_QUANTITY)] {
        let update = store.adjust_provisioned_quantity(item.id, delta).await.unwrap();
        assert_eq!(
            update,
            QuantityUpdate::Rejected {
                available: 1,
                provisioned: 1
            }
        );
    }

    let update = store
        .conditional_update_item_quantity(item.id, 0, i64::MAX)
        .await
        .unwrap();
    assert!(!update.is_applied());

    let update = store
        .adjust_provisioned_quantity(item.id, i64::from(MAX_QUANTITY) - 1)
        .await
        .unwrap();
    assert_eq!(
        update,
        QuantityUpdate::Applied {
            available: MAX_QUANTITY
        }
    );
}

#[tokio::test]
#[serial]
async fn update_item_details() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 1).await;

    let updated = store
        .update_item_details(
            item.id,
            ItemDetails {
                name: Some("Barrier".to_string()),
                description: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Barrier");
    assert!(updated.description.is_none());

    let result = store
        .update_item_details(ItemId::new(), ItemDetails::default())
        .await;
    assert!(matches!(result, Err(StoreError::ItemNotFound(_))));
}

#[tokio::test]
#[serial]
async fn search_items() {
    let store = get_test_store().await;
    seeded_item(&store, 1).await;
    store
        .insert_item(InventoryItem::new("Shovel", None, 1))
        .await
        .unwrap();

    let found = store
        .list_items(ItemQuery::new().search("orange"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Road barrier");

    let all = store.list_items(ItemQuery::new()).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
#[serial]
async fn request_status_compare_and_set() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 1).await;
    let request = EquipmentRequest::pending(&item, 1, period(), "crew@example.org");
    store.insert_request(request.clone()).await.unwrap();

    let applied = store
        .conditional_update_request_status(
            request.id,
            RequestStatus::Pending,
            RequestStatus::Denied,
            StatusChange::denied("out of season"),
        )
        .await
        .unwrap();
    let StatusTransition::Applied(updated) = applied else {
        panic!("expected transition to apply");
    };
    assert_eq!(updated.status, RequestStatus::Denied);
    assert_eq!(updated.denial_reason.as_deref(), Some("out of season"));

    let conflict = store
        .conditional_update_request_status(
            request.id,
            RequestStatus::Pending,
            RequestStatus::Approved,
            StatusChange::now(),
        )
        .await
        .unwrap();
    assert_eq!(
        conflict,
        StatusTransition::Conflict {
            actual: RequestStatus::Denied
        }
    );

    let missing = store
        .conditional_update_request_status(
            RequestId::new(),
            RequestStatus::Pending,
            RequestStatus::Approved,
            StatusChange::now(),
        )
        .await;
    assert!(matches!(missing, Err(StoreError::RequestNotFound(_))));
}

#[tokio::test]
#[serial]
async fn request_for_missing_item_is_rejected() {
    let store = get_test_store().await;
    let ghost = InventoryItem::new("Ghost", None, 1);
    let request = EquipmentRequest::pending(&ghost, 1, period(), "crew@example.org");

    let result = store.insert_request(request).await;
    assert!(matches!(result, Err(StoreError::ItemNotFound(id)) if id == ghost.id));
}

#[tokio::test]
#[serial]
async fn list_requests_by_status_and_cascade_delete() {
    let store = get_test_store().await;
    let item = seeded_item(&store, 5).await;
    let a = EquipmentRequest::pending(&item, 1, period(), "a@example.org");
    let b = EquipmentRequest::pending(&item, 2, period(), "b@example.org");
    store.insert_request(a.clone()).await.unwrap();
    store.insert_request(b.clone()).await.unwrap();

    store
        .conditional_update_request_status(
            b.id,
            RequestStatus::Pending,
            RequestStatus::Approved,
            StatusChange::now(),
        )
        .await
        .unwrap();

    let pending = store
        .list_requests(RequestQuery::with_status(RequestStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, a.id);

    assert!(store.delete_item(item.id).await.unwrap());
    let remaining = store.list_requests(RequestQuery::new()).await.unwrap();
    assert!(remaining.is_empty());
}
