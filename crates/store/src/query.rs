use crate::{InventoryItem, ItemId, RequestStatus, record::EquipmentRequest};

/// Builder for listing inventory items.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Case-insensitive substring matched against name and description.
    pub search: Option<String>,

    /// Maximum number of items to return.
    pub limit: Option<usize>,

    /// Number of items to skip.
    pub offset: Option<usize>,
}

impl ItemQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by a search term. Blank terms are ignored.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.trim().is_empty() {
            None
        } else {
            Some(term)
        };
        self
    }

    /// Limits the number of items returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many items before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `item` passes the search filter.
    pub fn matches(&self, item: &InventoryItem) -> bool {
        let Some(term) = &self.search else {
            return true;
        };
        let term = term.to_lowercase();
        item.name.to_lowercase().contains(&term)
            || item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term))
    }
}

/// Builder for listing equipment requests.
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    /// Filter by status.
    pub status: Option<RequestStatus>,

    /// Filter by the referenced item.
    pub item_id: Option<ItemId>,

    /// Maximum number of requests to return.
    pub limit: Option<usize>,

    /// Number of requests to skip.
    pub offset: Option<usize>,
}

impl RequestQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for requests in a given status.
    pub fn with_status(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Filters by status.
    pub fn status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by referenced item.
    pub fn item_id(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Limits the number of requests returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many requests before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `request` passes every filter.
    pub fn matches(&self, request: &EquipmentRequest) -> bool {
        if let Some(status) = self.status
            && request.status != status
        {
            return false;
        }
        if let Some(item_id) = self.item_id
            && request.item_id != item_id
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::BorrowPeriod;

    #[test]
    fn blank_search_is_ignored() {
        let query = ItemQuery::new().search("   ");
        assert!(query.search.is_none());
    }

    #[test]
    fn search_matches_name_or_description_case_insensitively() {
        let mut item = InventoryItem::new("Safety Vest", Some("High-visibility".to_string()), 3);
        assert!(ItemQuery::new().search("vest").matches(&item));
        assert!(ItemQuery::new().search("VISIB").matches(&item));
        assert!(!ItemQuery::new().search("ladder").matches(&item));

        item.description = None;
        assert!(!ItemQuery::new().search("visib").matches(&item));
    }

    #[test]
    fn request_query_filters_status_and_item() {
        let item = InventoryItem::new("Barrier", None, 4);
        let start = Utc::now();
        let request = EquipmentRequest::pending(
            &item,
            1,
            BorrowPeriod::new(start, start + Duration::hours(4)),
            "a@example.org",
        );

        assert!(RequestQuery::new().matches(&request));
        assert!(RequestQuery::with_status(RequestStatus::Pending).matches(&request));
        assert!(!RequestQuery::with_status(RequestStatus::Denied).matches(&request));
        assert!(RequestQuery::new().item_id(item.id).matches(&request));
        assert!(!RequestQuery::new().item_id(ItemId::new()).matches(&request));
    }

    #[test]
    fn query_builder_chain() {
        let id = ItemId::new();
        let query = RequestQuery::new()
            .status(RequestStatus::Approved)
            .item_id(id)
            .limit(10)
            .offset(5);

        assert_eq!(query.status, Some(RequestStatus::Approved));
        assert_eq!(query.item_id, Some(id));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }
}
