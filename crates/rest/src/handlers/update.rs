//! Update interaction handler.
//!
//! `PUT [base]/[type]/[id]`

use axum::{
    extract::{Path, State},
    response::Response,
};
use quill_persistence::core::VersionLog;
use quill_persistence::payload;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::ResourceBody;
use crate::state::AppState;

use super::create::write_response;

/// Handler for the update interaction.
///
/// Updates an existing resource, creates it if it doesn't exist (upsert), or
/// revives it if it was deleted.
///
/// # HTTP Request
///
/// `PUT [base]/[type]/[id]`
///
/// The body must carry an `id` equal to the one in the URL.
///
/// # Response
///
/// - `200 OK` - Resource updated
/// - `201 Created` - Resource created (upsert) or revived after a delete
/// - `400 Bad Request` - `id` missing or different from the URL; every issue is listed
/// - `409 Conflict` - A concurrent write won, or the id belongs to another type
///
/// # Example
///
/// ```http
/// PUT /Patient/123 HTTP/1.1
/// Host: quill.example.com
/// Content-Type: application/fhir+json
///
/// {"resourceType": "Patient", "id": "123", "name": [{"family": "Duck"}]}
/// ```
pub async fn update_handler<L>(
    State(state): State<AppState<L>>,
    Path((resource_type, id)): Path<(String, String)>,
    ResourceBody(resource): ResourceBody,
) -> RestResult<Response>
where
    L: VersionLog + 'static,
{
    debug!(resource_type = %resource_type, id = %id, "Processing update request");

    let content = payload::prepare_update(&resource_type, &id, resource)?;
    let outcome = state.lifecycle().update(&resource_type, &id, content).await?;

    debug!(
        resource_type = %resource_type,
        id = %id,
        version = outcome.version.version(),
        created = outcome.created,
        "Resource written"
    );

    Ok(write_response(&state, &outcome))
}
