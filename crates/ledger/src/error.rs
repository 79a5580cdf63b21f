//! Ledger error types.

use common::ItemId;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Not enough stock to cover a reservation.
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// The item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// A release would lift available stock above what is provisioned.
    #[error(
        "Release of {quantity} would exceed provisioned stock for item {item_id} \
         (available {available}, provisioned {provisioned})"
    )]
    OverRelease {
        item_id: ItemId,
        quantity: u32,
        available: u32,
        provisioned: u32,
    },

    /// Item metadata or a stock adjustment was rejected.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ItemNotFound(id) => LedgerError::ItemNotFound(id),
            other => LedgerError::Store(other),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
