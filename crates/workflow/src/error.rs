//! Workflow error types.

use chrono::{DateTime, Utc};
use common::{ItemId, RequestId};
use ledger::LedgerError;
use store::{RequestStatus, StoreError};
use thiserror::Error;

/// Malformed input. Always the caller's fault and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Requested quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error("Requested quantity {requested} exceeds the maximum of {max}")]
    QuantityTooLarge { requested: i64, max: u32 },

    #[error("Borrow period must end after it starts (start {start}, end {end})")]
    InvertedPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("A denial reason is required when denying a request")]
    MissingDenialReason,

    #[error("Requestor contact is required")]
    EmptyContact,

    #[error("Unknown decision '{0}', expected 'approved' or 'denied'")]
    UnknownDecision(String),
}

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The command was malformed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The referenced item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The request does not exist.
    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    /// Not enough stock to approve the request. The request stays pending.
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// The request cannot be resolved in its current state.
    #[error("Invalid state for request {request_id}: {reason}")]
    InvalidState {
        request_id: RequestId,
        reason: String,
    },

    /// An unexpected ledger error.
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    /// The task committing a resolution stopped before reporting back.
    #[error("Resolution interrupted: {0}")]
    Interrupted(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl WorkflowError {
    /// A resolve attempted on a request that is no longer pending.
    pub fn not_pending(request_id: RequestId, status: RequestStatus) -> Self {
        WorkflowError::InvalidState {
            request_id,
            reason: format!("request is already {status}"),
        }
    }

    /// A resolve attempted while another resolve of the same request runs.
    pub fn resolve_in_progress(request_id: RequestId) -> Self {
        WorkflowError::InvalidState {
            request_id,
            reason: "request is already being resolved".to_string(),
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientStock {
                item_id,
                requested,
                available,
            } => WorkflowError::InsufficientStock {
                item_id,
                requested,
                available,
            },
            LedgerError::ItemNotFound(id) => WorkflowError::ItemNotFound(id),
            LedgerError::Store(e) => e.into(),
            other => WorkflowError::Ledger(other),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ItemNotFound(id) => WorkflowError::ItemNotFound(id),
            StoreError::RequestNotFound(id) => WorkflowError::RequestNotFound(id),
            other => WorkflowError::Store(other),
        }
    }
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
