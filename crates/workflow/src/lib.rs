//! Equipment request workflow.
//!
//! A request is created `pending` against an inventory item and resolved
//! exactly once by a reviewer:
//! 1. Denial records the reason and never touches stock
//! 2. Approval reserves stock in the ledger, then commits the status
//!
//! If the approval commit fails after stock was reserved, the reservation is
//! released before the error is returned. The requestor is notified after
//! the transition is committed; delivery failures are reported but never
//! undo the transition.

pub mod commands;
pub mod coordinator;
pub mod error;
mod in_flight;
pub mod services;

pub use commands::{CreateRequest, Decision, ResolveRequest};
pub use coordinator::{NotificationOutcome, RequestWorkflow, Resolution};
pub use error::{Result, ValidationError, WorkflowError};
pub use services::{InMemoryNotifier, LogNotifier, Notification, NotifyError, Notifier};
