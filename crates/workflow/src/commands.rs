//! Commands accepted by the request workflow.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{ItemId, RequestId};
use serde::{Deserialize, Serialize};
use store::{BorrowPeriod, MAX_QUANTITY, RequestStatus};

use crate::error::ValidationError;

/// A reviewer's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Denied,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Denied => "denied",
        }
    }

    /// The terminal status this decision moves a request into.
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Decision::Approved => RequestStatus::Approved,
            Decision::Denied => RequestStatus::Denied,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Decision::Approved),
            "denied" => Ok(Decision::Denied),
            other => Err(ValidationError::UnknownDecision(other.to_string())),
        }
    }
}

/// Command to file a new borrow request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub item_id: ItemId,
    pub requested_quantity: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub requestor_contact: String,
}

impl CreateRequest {
    pub fn new(
        item_id: ItemId,
        requested_quantity: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        requestor_contact: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            requested_quantity,
            start,
            end,
            requestor_contact: requestor_contact.into(),
        }
    }

    /// Checks the command and returns the normalized quantity, period and
    /// contact. Does not look at the item.
    pub(crate) fn validate(&self) -> Result<(u32, BorrowPeriod, String), ValidationError> {
        if self.requested_quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity(self.requested_quantity));
        }
        let quantity = u32::try_from(self.requested_quantity)
            .ok()
            .filter(|q| *q <= MAX_QUANTITY)
            .ok_or(ValidationError::QuantityTooLarge {
                requested: self.requested_quantity,
                max: MAX_QUANTITY,
            })?;

        let period = BorrowPeriod::new(self.start, self.end);
        if !period.is_well_formed() {
            return Err(ValidationError::InvertedPeriod {
                start: self.start,
                end: self.end,
            });
        }

        let contact = self.requestor_contact.trim();
        if contact.is_empty() {
            return Err(ValidationError::EmptyContact);
        }

        Ok((quantity, period, contact.to_string()))
    }
}

/// Command to approve or deny a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub request_id: RequestId,
    pub decision: Decision,
    #[serde(default)]
    pub denial_reason: Option<String>,
}

impl ResolveRequest {
    /// Approves a request.
    pub fn approve(request_id: RequestId) -> Self {
        Self {
            request_id,
            decision: Decision::Approved,
            denial_reason: None,
        }
    }

    /// Denies a request with the given reason.
    pub fn deny(request_id: RequestId, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            decision: Decision::Denied,
            denial_reason: Some(reason.into()),
        }
    }

    /// Returns the trimmed denial reason, required for denials.
    pub(crate) fn required_reason(&self) -> Result<String, ValidationError> {
        self.denial_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .ok_or(ValidationError::MissingDenialReason)
    }
}
