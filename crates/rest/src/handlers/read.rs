//! Read interaction handler.
//!
//! `GET [base]/[type]/[id]`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quill_persistence::conditional::{Evaluation, Validators};
use quill_persistence::core::VersionLog;
use quill_persistence::lifecycle::ReadOutcome;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::middleware::conditional::ConditionalHeaders;
use crate::responses::format_resource_response;
use crate::responses::headers::ResourceHeaders;
use crate::state::AppState;

use super::status_for;

/// Handler for the read interaction.
///
/// Reads the current version of a resource. Preconditions are evaluated
/// against the version metadata before any content is loaded.
///
/// # HTTP Request
///
/// `GET [base]/[type]/[id]`
///
/// # Headers
///
/// - `If-None-Match` - Return 304 Not Modified if the ETag matches
/// - `If-Modified-Since` - Return 304 Not Modified if not modified since date
///
/// # Response
///
/// - `200 OK` - Resource found, returns the resource
/// - `304 Not Modified` - Resource unchanged (conditional read)
/// - `404 Not Found` - Resource does not exist
/// - `410 Gone` - Resource was deleted
pub async fn read_handler<L>(
    State(state): State<AppState<L>>,
    Path((resource_type, id)): Path<(String, String)>,
    conditional: ConditionalHeaders,
) -> RestResult<Response>
where
    L: VersionLog + 'static,
{
    debug!(
        resource_type = %resource_type,
        id = %id,
        conditional = conditional.has_conditions(),
        "Processing read request"
    );

    let meta = match state.lifecycle().read_meta(&resource_type, &id).await? {
        ReadOutcome::Found(meta) => meta,
        ReadOutcome::NotFound => return Err(RestError::NotFound { resource_type, id }),
        ReadOutcome::Gone { .. } => return Err(RestError::Gone { resource_type, id }),
    };

    let validators = state.protocol().compute_validators(&meta);
    if let Some(response) = short_circuit(&state, conditional, &validators) {
        return Ok(response);
    }

    // Versions are immutable, so the one named by the metadata is still readable.
    let version = state
        .lifecycle()
        .read_version(&resource_type, &id, meta.version)
        .await?
        .found()
        .ok_or_else(|| RestError::InternalError {
            message: format!(
                "Version {} of {}/{} disappeared during read",
                meta.version, resource_type, id
            ),
        })?;

    debug!(
        resource_type = %resource_type,
        id = %id,
        version = version.version(),
        "Returning resource"
    );

    Ok(format_resource_response(
        StatusCode::OK,
        ResourceHeaders::from_validators(&validators).to_header_map(),
        &version,
    ))
}

/// Evaluates read preconditions; returns the 304 response when they hold.
pub(crate) fn short_circuit<L: VersionLog>(
    state: &AppState<L>,
    conditional: ConditionalHeaders,
    validators: &Validators,
) -> Option<Response> {
    if !conditional.has_conditions() {
        return None;
    }

    let preconditions = conditional.into_preconditions();
    match state.protocol().evaluate(&preconditions, validators) {
        Evaluation::ShortCircuit => {
            debug!(etag = %validators.etag, "Returning 304 Not Modified");
            let class = Evaluation::ShortCircuit.response_class()?;
            Some(
                (
                    status_for(class),
                    ResourceHeaders::from_validators(validators)
                        .without_content_type()
                        .to_header_map(),
                )
                    .into_response(),
            )
        }
        Evaluation::Proceed => None,
    }
}
