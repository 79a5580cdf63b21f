//! Persistence for inventory items and equipment requests.
//!
//! The [`InventoryStore`] trait is the only way the ledger and the request
//! workflow touch durable state. Both backends expose the same guarded,
//! single-step updates for quantities and request status.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod status;
pub mod store;

pub use common::{ItemId, RequestId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{ItemQuery, RequestQuery};
pub use record::{BorrowPeriod, EquipmentRequest, InventoryItem, MAX_QUANTITY};
pub use status::{RequestStatus, UnknownStatus};
pub use store::{
    InventoryStore, InventoryStoreExt, ItemDetails, QuantityUpdate, StatusChange,
    StatusTransition,
};
