//! External collaborators of the workflow.

pub mod notification;

pub use notification::{InMemoryNotifier, LogNotifier, Notification, NotifyError, Notifier};
