//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger::LedgerError;
use store::StoreError;
use workflow::WorkflowError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Inventory ledger error.
    Ledger(LedgerError),
    /// Request workflow error.
    Workflow(WorkflowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            ApiError::Ledger(err) => ledger_error_to_response(err),
            ApiError::Workflow(err) => workflow_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

type Mapped = (StatusCode, &'static str, String);

fn ledger_error_to_response(err: LedgerError) -> Mapped {
    match &err {
        LedgerError::ItemNotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        LedgerError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, "insufficient_stock", err.to_string())
        }
        LedgerError::OverRelease { .. } => (StatusCode::CONFLICT, "over_release", err.to_string()),
        LedgerError::InvalidItem(_) => (StatusCode::BAD_REQUEST, "validation", err.to_string()),
        LedgerError::Store(store_err) => store_error_to_response(store_err),
    }
}

fn workflow_error_to_response(err: WorkflowError) -> Mapped {
    match err {
        WorkflowError::Validation(_) => (StatusCode::BAD_REQUEST, "validation", err.to_string()),
        WorkflowError::ItemNotFound(_) | WorkflowError::RequestNotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        WorkflowError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, "insufficient_stock", err.to_string())
        }
        WorkflowError::InvalidState { .. } => {
            (StatusCode::CONFLICT, "invalid_state", err.to_string())
        }
        WorkflowError::Ledger(ledger_err) => ledger_error_to_response(ledger_err),
        WorkflowError::Store(ref store_err) => store_error_to_response(store_err),
        WorkflowError::Interrupted(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            err.to_string(),
        ),
    }
}

fn store_error_to_response(err: &StoreError) -> Mapped {
    match err {
        StoreError::ItemNotFound(_) | StoreError::RequestNotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        StoreError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate", err.to_string()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            err.to_string(),
        ),
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}
