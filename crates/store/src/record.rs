//! Persisted record types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, RequestId, RequestStatus};

/// Largest quantity a record may hold. Quantity columns are 32-bit signed
/// integers.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// A loanable inventory item with a bounded quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub description: Option<String>,

    /// Units currently lendable. Only the ledger writes this.
    pub available_quantity: u32,

    /// Units owned. `available_quantity` never exceeds it.
    pub provisioned_quantity: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Creates a fully available item with the given stock.
    pub fn new(name: impl Into<String>, description: Option<String>, quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            name: name.into(),
            description,
            available_quantity: quantity,
            provisioned_quantity: quantity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the number of units currently lent out.
    pub fn reserved_quantity(&self) -> u32 {
        self.provisioned_quantity
            .saturating_sub(self.available_quantity)
    }
}

/// The time window a request wants to borrow equipment for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BorrowPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns true if the period ends strictly after it starts.
    pub fn is_well_formed(&self) -> bool {
        self.end > self.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A borrow request against a single inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRequest {
    pub id: RequestId,
    pub item_id: ItemId,

    /// Item display name captured when the request was filed.
    pub item_name: String,

    pub requested_quantity: u32,
    pub period: BorrowPeriod,
    pub status: RequestStatus,

    /// Present if and only if `status` is `Denied`.
    pub denial_reason: Option<String>,

    /// Opaque contact used only for notifications.
    pub requestor_contact: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentRequest {
    /// Creates a new pending request for `item`.
    pub fn pending(
        item: &InventoryItem,
        requested_quantity: u32,
        period: BorrowPeriod,
        requestor_contact: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            item_id: item.id,
            item_name: item.name.clone(),
            requested_quantity,
            period,
            status: RequestStatus::Pending,
            denial_reason: None,
            requestor_contact: requestor_contact.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
