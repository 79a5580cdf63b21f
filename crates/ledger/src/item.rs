use serde::{Deserialize, Serialize};
use store::{InventoryItem, MAX_QUANTITY};

use crate::{LedgerError, Result};

/// A new item to provision into the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: u32,
}

impl NewItem {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            description: None,
            quantity,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validates the item and builds a fully available record.
    pub(crate) fn into_item(self) -> Result<InventoryItem> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidItem("name is required".to_string()));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(LedgerError::InvalidItem(format!(
                "quantity {} exceeds the maximum of {MAX_QUANTITY}",
                self.quantity
            )));
        }
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(InventoryItem::new(name, description, self.quantity))
    }
}
