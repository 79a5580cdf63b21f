//! Request workflow coordinator.

use std::sync::Arc;
use std::time::Instant;

use common::RequestId;
use ledger::InventoryLedger;
use store::{
    EquipmentRequest, InventoryStore, RequestQuery, RequestStatus, StatusChange,
    StatusTransition,
};
use tracing::Instrument;

use crate::commands::{CreateRequest, Decision, ResolveRequest};
use crate::error::{Result, WorkflowError};
use crate::in_flight::{InFlight, InFlightGuard};
use crate::services::notification::{Notification, Notifier};

/// Whether the requestor was told about a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered,
    /// Delivery failed. The resolution itself stands.
    Failed(String),
}

impl NotificationOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotificationOutcome::Delivered)
    }
}

/// A committed resolution and the outcome of notifying the requestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub request: EquipmentRequest,
    pub notification: NotificationOutcome,
}

/// Owns the request state machine.
///
/// Approval reserves stock before the status is committed, and a failed
/// commit releases that stock again, so a request is approved exactly when
/// it holds a real reservation. The status change itself is a
/// compare-and-set from `pending`, which makes a second resolve of the same
/// request fail with `InvalidState`.
///
/// Once a resolve has passed validation, the commit runs on its own task and
/// finishes even if the caller stops waiting for it.
pub struct RequestWorkflow<S, N>
where
    S: InventoryStore,
    N: Notifier,
{
    ledger: InventoryLedger<S>,
    notifier: Arc<N>,
    in_flight: InFlight,
}

impl<S, N> RequestWorkflow<S, N>
where
    S: InventoryStore + Clone + 'static,
    N: Notifier + 'static,
{
    /// Creates a new workflow over the given ledger.
    pub fn new(ledger: InventoryLedger<S>, notifier: N) -> Self {
        Self {
            ledger,
            notifier: Arc::new(notifier),
            in_flight: InFlight::default(),
        }
    }

    /// Returns a reference to the ledger.
    pub fn ledger(&self) -> &InventoryLedger<S> {
        &self.ledger
    }

    fn store(&self) -> &S {
        self.ledger.store()
    }

    /// Files a new pending request. Stock is not touched.
    #[tracing::instrument(skip(self, cmd), fields(item_id = %cmd.item_id))]
    pub async fn create(&self, cmd: CreateRequest) -> Result<EquipmentRequest> {
        let (quantity, period, contact) = cmd.validate()?;

        let item = self
            .store()
            .get_item(cmd.item_id)
            .await?
            .ok_or(WorkflowError::ItemNotFound(cmd.item_id))?;

        let request = EquipmentRequest::pending(&item, quantity, period, contact);
        self.store().insert_request(request.clone()).await?;

        metrics::counter!("requests_created_total").increment(1);
        tracing::info!(request_id = %request.id, quantity, "request created");

        Ok(request)
    }

    /// Approves or denies a pending request.
    ///
    /// Fails with `RequestNotFound` for an unknown id and `InvalidState` if
    /// the request is not pending or is being resolved concurrently. On
    /// `InsufficientStock` or `ItemNotFound` the request stays pending.
    #[tracing::instrument(
        skip(self, cmd),
        fields(request_id = %cmd.request_id, decision = %cmd.decision)
    )]
    pub async fn resolve(&self, cmd: ResolveRequest) -> Result<Resolution> {
        let started = Instant::now();
        let request_id = cmd.request_id;

        let guard = self
            .in_flight
            .try_claim(request_id)
            .ok_or_else(|| WorkflowError::resolve_in_progress(request_id))?;

        let request = self.get(request_id).await?;
        if !request.status.can_resolve() {
            return Err(WorkflowError::not_pending(request_id, request.status));
        }

        let change = match cmd.decision {
            Decision::Denied => StatusChange::denied(cmd.required_reason()?),
            Decision::Approved => StatusChange::now(),
        };

        let settlement = Settlement {
            ledger: self.ledger.clone(),
            notifier: Arc::clone(&self.notifier),
            request,
            decision: cmd.decision,
            change,
            started,
        };
        let task = tokio::spawn(settlement.run(guard).in_current_span());

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(WorkflowError::Interrupted(e.to_string())),
        }
    }

    /// Loads a request.
    pub async fn get(&self, request_id: RequestId) -> Result<EquipmentRequest> {
        self.store()
            .get_request(request_id)
            .await?
            .ok_or(WorkflowError::RequestNotFound(request_id))
    }

    /// Lists requests matching a query, newest first.
    pub async fn list(&self, query: RequestQuery) -> Result<Vec<EquipmentRequest>> {
        Ok(self.store().list_requests(query).await?)
    }
}

/// The committing half of a resolve: stock, status and notification.
///
/// Owns everything it touches so it can run on a spawned task. A reservation
/// it takes is either committed or released before `run` returns.
struct Settlement<S: InventoryStore, N: Notifier> {
    ledger: InventoryLedger<S>,
    notifier: Arc<N>,
    request: EquipmentRequest,
    decision: Decision,
    change: StatusChange,
    started: Instant,
}

impl<S: InventoryStore, N: Notifier> Settlement<S, N> {
    async fn run(self, guard: InFlightGuard) -> Result<Resolution> {
        let committed = match self.decision {
            Decision::Denied => self.transition(self.change.clone()).await,
            Decision::Approved => self.approve().await,
        };
        drop(guard);
        let resolved = committed?;

        metrics::counter!("requests_resolved_total", "decision" => self.decision.as_str())
            .increment(1);
        metrics::histogram!("request_resolve_duration_seconds")
            .record(self.started.elapsed().as_secs_f64());
        tracing::info!(request_id = %resolved.id, status = %resolved.status, "request resolved");

        let notification = self.notify(&resolved).await;
        Ok(Resolution {
            request: resolved,
            notification,
        })
    }

    async fn approve(&self) -> Result<EquipmentRequest> {
        let request = &self.request;
        self.ledger
            .reserve(request.item_id, request.requested_quantity)
            .await?;

        match self.transition(self.change.clone()).await {
            Ok(approved) => Ok(approved),
            Err(e) => {
                self.compensate(&e).await;
                Err(e)
            }
        }
    }

    async fn transition(&self, change: StatusChange) -> Result<EquipmentRequest> {
        let request = &self.request;
        let outcome = self
            .ledger
            .store()
            .conditional_update_request_status(
                request.id,
                RequestStatus::Pending,
                self.decision.target_status(),
                change,
            )
            .await?;

        match outcome {
            StatusTransition::Applied(updated) => Ok(updated),
            StatusTransition::Conflict { actual } => {
                Err(WorkflowError::not_pending(request.id, actual))
            }
        }
    }

    /// Gives back the stock reserved for an approval that did not commit.
    async fn compensate(&self, cause: &WorkflowError) {
        let request = &self.request;
        match self
            .ledger
            .release(request.item_id, request.requested_quantity)
            .await
        {
            Ok(available) => {
                metrics::counter!("workflow_compensations_total", "outcome" => "released")
                    .increment(1);
                tracing::warn!(
                    request_id = %request.id,
                    item_id = %request.item_id,
                    available,
                    error = %cause,
                    "approval not committed, reservation released"
                );
            }
            Err(e) => {
                metrics::counter!("workflow_compensations_total", "outcome" => "failed")
                    .increment(1);
                tracing::error!(
                    request_id = %request.id,
                    item_id = %request.item_id,
                    quantity = request.requested_quantity,
                    error = %e,
                    cause = %cause,
                    "failed to release reservation for uncommitted approval"
                );
            }
        }
    }

    async fn notify(&self, request: &EquipmentRequest) -> NotificationOutcome {
        let Some(notification) = Notification::for_request(request) else {
            return NotificationOutcome::Delivered;
        };

        match self.notifier.send(&notification).await {
            Ok(()) => NotificationOutcome::Delivered,
            Err(e) => {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::warn!(
                    request_id = %request.id,
                    recipient = %notification.recipient,
                    error = %e,
                    "notification failed"
                );
                NotificationOutcome::Failed(e.to_string())
            }
        }
    }
}
