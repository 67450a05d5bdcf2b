mod handlers;

use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::engine::Packman;

/// The engine shared between request handlers and deferred-mark tasks.
pub type SharedPackman = Arc<Mutex<Packman<Database>>>;

pub fn create_router(packman: SharedPackman) -> Router {
    let api = Router::new()
        // Views
        .route("/views", get(handlers::get_view_model))
        .route("/views/{view}", get(handlers::get_view))
        // Nodes
        .route("/nodes", get(handlers::list_nodes))
        .route("/nodes/{id}", get(handlers::get_node))
        // List replacement
        .route("/import", post(handlers::import_text))
        .route("/reset", post(handlers::reset))
        // Items
        .route("/items/{id}/pack", post(handlers::pack_item))
        .route("/items/{id}/not-needed", post(handlers::not_needed_item))
        .route("/items/{id}/restore", post(handlers::restore_item))
        // Groups
        .route("/groups/{id}/pack", post(handlers::pack_group))
        .route("/groups/{id}/not-needed", post(handlers::not_needed_group))
        .route("/groups/{id}/restore", post(handlers::restore_group))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(packman)
}
