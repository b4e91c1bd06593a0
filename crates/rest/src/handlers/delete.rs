//! Delete interaction handler.
//!
//! `DELETE [base]/[type]/[id]`

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use quill_persistence::core::VersionLog;
use quill_persistence::lifecycle::DeleteOutcome;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::state::AppState;

use super::status_for;

/// Handler for the delete interaction.
///
/// Appends a tombstone version; history is preserved.
///
/// # HTTP Request
///
/// `DELETE [base]/[type]/[id]`
///
/// # Response
///
/// - `204 No Content` - Resource deleted
/// - `404 Not Found` - Resource does not exist or is already deleted
/// - `409 Conflict` - A concurrent write won
pub async fn delete_handler<L>(
    State(state): State<AppState<L>>,
    Path((resource_type, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    L: VersionLog + 'static,
{
    debug!(resource_type = %resource_type, id = %id, "Processing delete request");

    let outcome = state.lifecycle().delete(&resource_type, &id).await?;
    match &outcome {
        DeleteOutcome::Deleted(tombstone) => {
            debug!(
                resource_type = %resource_type,
                id = %id,
                version = tombstone.version(),
                "Resource deleted"
            );
            Ok(status_for(outcome.response_class()).into_response())
        }
        DeleteOutcome::NotFound => Err(RestError::NotFound { resource_type, id }),
    }
}
