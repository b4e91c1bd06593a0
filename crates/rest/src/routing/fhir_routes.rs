//! Resource route configuration.

use axum::{
    Router,
    routing::{get, post},
};
use quill_persistence::core::VersionLog;

use crate::handlers;
use crate::state::AppState;

/// Creates all routes.
///
/// # Routes
///
/// ## System-level
/// - `GET /health` - Health check
///
/// ## Type-level
/// - `POST /{type}` - Create
///
/// ## Instance-level
/// - `GET /{type}/{id}` - Read
/// - `PUT /{type}/{id}` - Update
/// - `DELETE /{type}/{id}` - Delete
/// - `GET /{type}/{id}/_history` - Instance history
/// - `GET /{type}/{id}/_history/{vid}` - Version read
pub fn create_routes<L>(state: AppState<L>) -> Router
where
    L: VersionLog + 'static,
{
    Router::new()
        // System-level routes
        .route("/health", get(handlers::health_handler::<L>))
        // Type-level routes
        .route("/{resource_type}", post(handlers::create_handler::<L>))
        // Instance-level routes
        .route(
            "/{resource_type}/{id}",
            get(handlers::read_handler::<L>)
                .put(handlers::update_handler::<L>)
                .delete(handlers::delete_handler::<L>),
        )
        .route(
            "/{resource_type}/{id}/_history",
            get(handlers::history_instance_handler::<L>),
        )
        .route(
            "/{resource_type}/{id}/_history/{version_id}",
            get(handlers::vread_handler::<L>),
        )
        // State
        .with_state(state)
}
