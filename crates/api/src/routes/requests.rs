//! Equipment request endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::RequestId;
use serde::{Deserialize, Serialize};
use store::{EquipmentRequest, InventoryStore, RequestQuery, RequestStatus};
use workflow::{CreateRequest, Decision, NotificationOutcome, ResolveRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::items::parse_item_id;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListRequestsParams {
    pub status: Option<String>,
    pub item_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub item_id: String,
    pub requested_quantity: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub requestor_contact: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequestBody {
    pub status: String,
    pub denial_reason: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct RequestResponse {
    pub id: String,
    pub item_id: String,
    pub item_name: String,
    pub requested_quantity: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: RequestStatus,
    pub denial_reason: Option<String>,
    pub requestor_contact: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EquipmentRequest> for RequestResponse {
    fn from(request: EquipmentRequest) -> Self {
        Self {
            id: request.id.to_string(),
            item_id: request.item_id.to_string(),
            item_name: request.item_name,
            requested_quantity: request.requested_quantity,
            start: request.period.start,
            end: request.period.end,
            status: request.status,
            denial_reason: request.denial_reason,
            requestor_contact: request.requestor_contact,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    #[serde(flatten)]
    pub request: RequestResponse,
    pub notification_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// -- Handlers --

/// GET /requests: list requests, optionally filtered by status or item.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListRequestsParams>,
) -> Result<Json<Vec<RequestResponse>>, ApiError> {
    let mut query = RequestQuery::new();
    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        let status = status
            .parse::<RequestStatus>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        query = query.status(status);
    }
    if let Some(item_id) = params.item_id.as_deref() {
        query = query.item_id(parse_item_id(item_id)?);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let requests = state.workflow.list(query).await?;
    Ok(Json(requests.into_iter().map(RequestResponse::from).collect()))
}

/// POST /requests: file a new pending request.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<RequestResponse>), ApiError> {
    let item_id = parse_item_id(&req.item_id)?;
    let request = state
        .workflow
        .create(CreateRequest::new(
            item_id,
            req.requested_quantity,
            req.start,
            req.end,
            req.requestor_contact,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

/// GET /requests/:id: load a request.
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<RequestResponse>, ApiError> {
    let request_id = parse_request_id(&id)?;
    let request = state.workflow.get(request_id).await?;
    Ok(Json(request.into()))
}

/// PUT /requests/:id: approve or deny a pending request.
#[tracing::instrument(skip(state, req))]
pub async fn resolve<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequestBody>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let request_id = parse_request_id(&id)?;
    let decision = req.status.parse::<Decision>().map_err(|_| {
        ApiError::BadRequest("Valid status (approved or denied) is required".to_string())
    })?;

    let resolution = state
        .workflow
        .resolve(ResolveRequest {
            request_id,
            decision,
            denial_reason: req.denial_reason,
        })
        .await?;

    let warning = match resolution.notification {
        NotificationOutcome::Delivered => None,
        NotificationOutcome::Failed(reason) => {
            Some(format!("Request {decision}, but the notification failed: {reason}"))
        }
    };

    Ok(Json(ResolveResponse {
        request: resolution.request.into(),
        notification_sent: warning.is_none(),
        warning,
    }))
}

fn parse_request_id(id: &str) -> Result<RequestId, ApiError> {
    RequestId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid request id: {e}")))
}
