//! Health check endpoint handler.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quill_persistence::core::VersionLog;
use tracing::{debug, warn};

use crate::error::{RestError, RestResult};
use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// Runs the backend's own health check, so a broken database shows up here.
///
/// # HTTP Request
///
/// `GET [base]/health`
///
/// # Response
///
/// - `200 OK` - Server and backend are healthy
/// - `503 Service Unavailable` - The backend check failed
pub async fn health_handler<L>(State(state): State<AppState<L>>) -> RestResult<Response>
where
    L: VersionLog + 'static,
{
    debug!("Processing health check request");

    let backend = state.log();
    if let Err(err) = backend.health_check().await {
        warn!(backend = backend.name(), error = %err, "Backend health check failed");
        return Err(RestError::ServiceUnavailable {
            message: err.to_string(),
        });
    }

    let health_response = serde_json::json!({
        "status": "healthy",
        "backend": backend.name(),
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    Ok((StatusCode::OK, Json(health_response)).into_response())
}
