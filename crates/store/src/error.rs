use thiserror::Error;

use crate::{ItemId, RequestId};

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The inventory item was not found.
    #[error("Inventory item not found: {0}")]
    ItemNotFound(ItemId),

    /// The equipment request was not found.
    #[error("Equipment request not found: {0}")]
    RequestNotFound(RequestId),

    /// A record with the same id already exists.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A stored value could not be mapped back into a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The backend refused or failed the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
