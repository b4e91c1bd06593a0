//! Create interaction handler.
//!
//! `POST [base]/[type]`

use axum::{
    extract::{Path, State},
    response::Response,
};
use quill_persistence::core::VersionLog;
use quill_persistence::lifecycle::WriteOutcome;
use quill_persistence::payload;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::ResourceBody;
use crate::responses::format_resource_response;
use crate::responses::headers::ResourceHeaders;
use crate::state::AppState;

use super::status_for;

/// Handler for the create interaction.
///
/// Creates a new resource. The server assigns the resource ID; any `id` or
/// `meta` in the body is ignored.
///
/// # HTTP Request
///
/// `POST [base]/[type]`
///
/// # Response
///
/// - `201 Created` - Resource created, with `Location`, `ETag` and `Last-Modified`
/// - `400 Bad Request` - Body is not a JSON object, or its resourceType disagrees with the URL
///
/// # Example
///
/// ```http
/// POST /Patient HTTP/1.1
/// Host: quill.example.com
/// Content-Type: application/fhir+json
///
/// {"resourceType": "Patient", "name": [{"family": "Duck"}]}
/// ```
pub async fn create_handler<L>(
    State(state): State<AppState<L>>,
    Path(resource_type): Path<String>,
    ResourceBody(resource): ResourceBody,
) -> RestResult<Response>
where
    L: VersionLog + 'static,
{
    debug!(resource_type = %resource_type, "Processing create request");

    let content = payload::prepare_create(&resource_type, resource)?;
    let outcome = state.lifecycle().create(&resource_type, content).await?;

    debug!(
        resource_type = %resource_type,
        id = %outcome.version.resource_id(),
        "Resource created"
    );

    Ok(write_response(&state, &outcome))
}

/// Builds the response of a write: the new representation with `Location`,
/// `ETag` and `Last-Modified` computed from the version just written.
pub(crate) fn write_response<L: VersionLog>(state: &AppState<L>, outcome: &WriteOutcome) -> Response {
    let validators = state.protocol().compute_validators(&outcome.version.meta());
    let location = format!("{}/{}", state.base_url(), outcome.version.versioned_url());

    format_resource_response(
        status_for(outcome.response_class()),
        ResourceHeaders::from_validators(&validators)
            .with_location(location)
            .to_header_map(),
        &outcome.version,
    )
}
