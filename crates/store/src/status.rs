//! Equipment request state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The state of an equipment request in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Approved
///           └──► Denied
/// ```
///
/// Both `Approved` and `Denied` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Filed by a requester, awaiting review. No stock is held.
    #[default]
    Pending,

    /// Approved by a reviewer; the requested quantity is reserved.
    Approved,

    /// Denied by a reviewer with a reason; stock was never touched.
    Denied,
}

impl RequestStatus {
    /// Returns true if a reviewer may still resolve the request.
    pub fn can_resolve(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Denied)
    }

    /// Returns the lowercase wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown request status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "denied" => Ok(RequestStatus::Denied),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
