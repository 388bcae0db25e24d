use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    services::RecommendationService,
};

pub mod cache;
pub mod recommendations;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
    /// Listening-history window for user lookups
    pub history_period: String,
    /// Number of top tracks used as listening history
    pub history_limit: u32,
}

/// Creates the application router with all routes
///
/// Every response carries an `x-request-id` header and every request is
/// traced under a span holding that id.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/:username/recommendations",
            get(recommendations::recommend_for_user),
        )
        .route("/recommendations", post(recommendations::recommend))
        .route("/cache", delete(cache::clear))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
