//! HTTP API server with observability for the equipment reservation system.
//!
//! Provides REST endpoints for inventory administration and the borrow
//! request workflow, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ledger::InventoryLedger;
use metrics_exporter_prometheus::PrometheusHandle;
use store::InventoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use workflow::{Notifier, RequestWorkflow};

/// Shared application state accessible from all handlers.
pub struct AppState<S: InventoryStore> {
    pub ledger: InventoryLedger<S>,
    pub workflow: RequestWorkflow<S, Arc<dyn Notifier>>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/inventory",
            get(routes::items::list::<S>).post(routes::items::create::<S>),
        )
        .route(
            "/inventory/{id}",
            get(routes::items::get::<S>)
                .put(routes::items::update::<S>)
                .delete(routes::items::remove::<S>),
        )
        .route("/inventory/{id}/stock", post(routes::items::adjust_stock::<S>))
        .route(
            "/requests",
            get(routes::requests::list::<S>).post(routes::requests::create::<S>),
        )
        .route(
            "/requests/{id}",
            get(routes::requests::get::<S>).put(routes::requests::resolve::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a store and a notifier.
pub fn create_default_state<S: InventoryStore + Clone + 'static>(
    store: S,
    notifier: Arc<dyn Notifier>,
) -> Arc<AppState<S>> {
    let ledger = InventoryLedger::new(store);
    let workflow = RequestWorkflow::new(ledger.clone(), notifier);

    Arc::new(AppState { ledger, workflow })
}
