//! Inventory ledger.
//!
//! The ledger is the only writer of an item's available quantity. Every
//! stock mutation is a single guarded update in the underlying store, so
//! concurrent reservations against one item can never overdraw it.

pub mod error;
pub mod item;
mod ledger;

pub use error::{LedgerError, Result};
pub use item::NewItem;
pub use ledger::InventoryLedger;
