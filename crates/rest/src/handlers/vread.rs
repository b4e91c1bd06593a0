//! Version read (vread) interaction handler.
//!
//! `GET [base]/[type]/[id]/_history/[vid]`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use quill_persistence::core::VersionLog;
use quill_persistence::lifecycle::ReadOutcome;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::middleware::conditional::ConditionalHeaders;
use crate::responses::format_resource_response;
use crate::responses::headers::ResourceHeaders;
use crate::state::AppState;

use super::read::short_circuit;

/// Handler for the vread interaction.
///
/// Reads a specific version of a resource. Earlier versions stay readable
/// after the resource is deleted; the tombstone version itself is gone.
///
/// # HTTP Request
///
/// `GET [base]/[type]/[id]/_history/[vid]`
///
/// # Response
///
/// - `200 OK` - Version found, returns the resource as of that version
/// - `304 Not Modified` - Version unchanged (conditional read)
/// - `404 Not Found` - Resource or version does not exist, or `vid` is not a number
/// - `410 Gone` - The version is a tombstone
pub async fn vread_handler<L>(
    State(state): State<AppState<L>>,
    Path((resource_type, id, version_id)): Path<(String, String, String)>,
    conditional: ConditionalHeaders,
) -> RestResult<Response>
where
    L: VersionLog + 'static,
{
    debug!(
        resource_type = %resource_type,
        id = %id,
        version_id = %version_id,
        "Processing vread request"
    );

    let not_found = |version_id: String| RestError::VersionNotFound {
        resource_type: resource_type.clone(),
        id: id.clone(),
        version_id,
    };

    let Ok(version) = version_id.parse::<u64>() else {
        return Err(not_found(version_id));
    };

    let meta = match state
        .lifecycle()
        .read_version_meta(&resource_type, &id, version)
        .await?
    {
        ReadOutcome::Found(meta) => meta,
        ReadOutcome::NotFound => return Err(not_found(version_id)),
        ReadOutcome::Gone { version, .. } => {
            return Err(RestError::VersionGone {
                resource_type: resource_type.clone(),
                id: id.clone(),
                version_id: version,
            });
        }
    };

    let validators = state.protocol().compute_validators(&meta);
    if let Some(response) = short_circuit(&state, conditional, &validators) {
        return Ok(response);
    }

    let stored = state
        .lifecycle()
        .read_version(&resource_type, &id, version)
        .await?
        .found()
        .ok_or_else(|| not_found(version_id.clone()))?;

    Ok(format_resource_response(
        StatusCode::OK,
        ResourceHeaders::from_validators(&validators).to_header_map(),
        &stored,
    ))
}
