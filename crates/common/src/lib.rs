//! Shared identifier types for the equipment reservation workspace.

mod types;

pub use types::{ItemId, RequestId};
