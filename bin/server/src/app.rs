//! Application state and router.

use crate::routes;
use axum::Router;
use axum::routing::{get, post};
use chime_scheduler::{TriggerService, TriggerStore};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    /// Trigger service over the configured store.
    pub service: TriggerService,
}

impl AppState {
    /// Creates application state over the given store.
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self {
            service: TriggerService::new(store),
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/triggers/",
            post(routes::create_trigger).get(routes::list_triggers),
        )
        .route("/triggers/api/", post(routes::create_api_trigger))
        .route("/logs/", get(routes::list_logs))
        .route("/health/", get(routes::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
