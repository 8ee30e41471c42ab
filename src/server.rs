//! HTTP surface of the coordinator.

use crate::executor::coordinator::Coordinator;
use crate::executor::handlers::{
    handle_node_data, handle_plugin_poll, handle_plugin_request, handle_status,
};
use crate::executor::protocol::{
    ENDPOINT_NODE_DATA, ENDPOINT_PLUGIN_POLL, ENDPOINT_PLUGIN_REQUEST, ENDPOINT_STATUS,
};

use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Builds the router for the client, worker and polling endpoints.
///
/// CORS is permissive: the poll endpoint is called from browser pages on other origins.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route(ENDPOINT_STATUS, get(handle_status))
        .route(ENDPOINT_PLUGIN_REQUEST, post(handle_plugin_request))
        .route(&format!("{}/:qid", ENDPOINT_NODE_DATA), post(handle_node_data))
        .route(&format!("{}/:qid", ENDPOINT_PLUGIN_POLL), get(handle_plugin_poll))
        .layer(Extension(coordinator))
        .layer(CorsLayer::permissive())
}
