//! Notification service trait and implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use store::{BorrowPeriod, EquipmentRequest, RequestStatus};
use thiserror::Error;

use crate::commands::Decision;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Errors reported by a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Message telling a requestor how their request was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub decision: Decision,
    pub recipient: String,
    pub item_name: String,
    pub quantity: u32,
    pub period: BorrowPeriod,
    pub denial_reason: Option<String>,
}

impl Notification {
    /// Builds the message for a resolved request. Returns `None` while the
    /// request is still pending.
    pub fn for_request(request: &EquipmentRequest) -> Option<Self> {
        let decision = match request.status {
            RequestStatus::Pending => return None,
            RequestStatus::Approved => Decision::Approved,
            RequestStatus::Denied => Decision::Denied,
        };
        Some(Self {
            decision,
            recipient: request.requestor_contact.clone(),
            item_name: request.item_name.clone(),
            quantity: request.requested_quantity,
            period: request.period,
            denial_reason: request.denial_reason.clone(),
        })
    }

    pub fn subject(&self) -> &'static str {
        match self.decision {
            Decision::Approved => "Equipment Request Approved",
            Decision::Denied => "Equipment Request Denied",
        }
    }

    /// Plain-text message body.
    pub fn body(&self) -> String {
        let opening = match self.decision {
            Decision::Approved => "Good news! Your equipment request has been approved.",
            Decision::Denied => "We regret to inform you that your equipment request has been denied.",
        };
        let closing = match (self.decision, &self.denial_reason) {
            (Decision::Approved, _) => {
                "Please coordinate with the office staff for pickup arrangements.\n".to_string()
            }
            (Decision::Denied, reason) => {
                let reason = reason
                    .as_deref()
                    .map(|r| format!("Reason for Denial:\n  {r}\n\n"))
                    .unwrap_or_default();
                format!(
                    "{reason}If you have questions about this decision, please contact the office staff.\n"
                )
            }
        };

        let details = [
            format!("  Item: {}", self.item_name),
            format!("  Quantity: {}", self.quantity),
            format!("  Start Date: {}", self.period.start.format(DATE_FORMAT)),
            format!("  End Date: {}", self.period.end.format(DATE_FORMAT)),
        ]
        .join("\n");

        format!("{opening}\n\nRequest Details:\n{details}\n\n{closing}")
    }
}

/// Trait for delivering resolution notifications.
///
/// Delivery is best effort. The workflow logs failures and never retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).send(notification).await
    }
}

/// Notifier that writes messages to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient,
            subject = notification.subject(),
            body = %notification.body(),
            "notification sent"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    fail_on_send: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the notifications delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the number of notifications delivered.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(NotifyError::Delivery("mailbox unavailable".to_string()));
        }

        state.sent.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use store::InventoryItem;

    use super::*;

    fn resolved(status: RequestStatus, reason: Option<&str>) -> EquipmentRequest {
        let item = InventoryItem::new("Pressure washer", None, 2);
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 4, 17, 0, 0).unwrap();
        let mut request =
            EquipmentRequest::pending(&item, 2, BorrowPeriod::new(start, end), "crew@example.org");
        request.status = status;
        request.denial_reason = reason.map(str::to_string);
        request
    }

    #[test]
    fn pending_requests_have_no_notification() {
        assert!(Notification::for_request(&resolved(RequestStatus::Pending, None)).is_none());
    }

    #[test]
    fn approval_message() {
        let n = Notification::for_request(&resolved(RequestStatus::Approved, None)).unwrap();
        assert_eq!(n.subject(), "Equipment Request Approved");
        assert_eq!(n.recipient, "crew@example.org");

        let body = n.body();
        assert!(body.contains("Item: Pressure washer"));
        assert!(body.contains("Quantity: 2"));
        assert!(body.contains("Start Date: 2026-03-01 09:00 UTC"));
        assert!(body.contains("End Date: 2026-03-04 17:00 UTC"));
        assert!(!body.contains("Reason for Denial"));
    }

    #[test]
    fn approval_body_layout() {
        let n = Notification::for_request(&resolved(RequestStatus::Approved, None)).unwrap();
        assert_eq!(
            n.body(),
            "Good news! Your equipment request has been approved.\n\
             \n\
             Request Details:\n  \
             Item: Pressure washer\n  \
             Quantity: 2\n  \
             Start Date: 2026-03-01 09:00 UTC\n  \
             End Date: 2026-03-04 17:00 UTC\n\
             \n\
             Please coordinate with the office staff for pickup arrangements.\n"
        );
    }

    #[test]
    fn denial_without_reason_skips_the_reason_block() {
        let n = Notification::for_request(&resolved(RequestStatus::Denied, None)).unwrap();
        let body = n.body();
        assert!(!body.contains("Reason for Denial"));
        assert!(body.ends_with("please contact the office staff.\n"));
    }

    #[test]
    fn denial_message_carries_reason() {
        let n = Notification::for_request(&resolved(RequestStatus::Denied, Some("in repair")))
            .unwrap();
        assert_eq!(n.subject(), "Equipment Request Denied");
        assert!(n.body().contains("Reason for Denial:\n  in repair"));
    }

    #[tokio::test]
    async fn in_memory_notifier_records_and_fails_on_demand() {
        let notifier = InMemoryNotifier::new();
        let n = Notification::for_request(&resolved(RequestStatus::Approved, None)).unwrap();

        notifier.send(&n).await.unwrap();
        assert_eq!(notifier.sent_count(), 1);

        notifier.set_fail_on_send(true);
        assert!(notifier.send(&n).await.is_err());
        assert_eq!(notifier.sent_count(), 1);
    }

    #[tokio::test]
    async fn shared_notifier_forwards() {
        let inner = InMemoryNotifier::new();
        let shared: Arc<dyn Notifier> = Arc::new(inner.clone());
        let n = Notification::for_request(&resolved(RequestStatus::Denied, Some("no"))).unwrap();

        shared.send(&n).await.unwrap();
        assert_eq!(inner.sent()[0].decision, Decision::Denied);
    }
}
