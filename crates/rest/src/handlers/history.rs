//! History interaction handler.
//!
//! `GET [base]/[type]/[id]/_history`

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quill_persistence::core::VersionLog;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::responses::headers::ResourceHeaders;
use crate::responses::history_bundle;
use crate::state::AppState;

/// Handler for instance history.
///
/// Returns every version of a resource, newest first, including tombstones.
///
/// # HTTP Request
///
/// `GET [base]/[type]/[id]/_history`
///
/// # Response
///
/// - `200 OK` - A Bundle of type "history"
/// - `404 Not Found` - Nothing was ever written under this id and type
pub async fn history_instance_handler<L>(
    State(state): State<AppState<L>>,
    Path((resource_type, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    L: VersionLog + 'static,
{
    debug!(resource_type = %resource_type, id = %id, "Processing instance history request");

    let Some(versions) = state.lifecycle().history(&resource_type, &id).await? else {
        return Err(RestError::NotFound { resource_type, id });
    };

    let self_url = format!("{}/{}/{}/_history", state.base_url(), resource_type, id);
    let bundle = history_bundle(state.base_url(), &self_url, &versions);

    Ok((
        StatusCode::OK,
        ResourceHeaders::new().to_header_map(),
        Json(bundle),
    )
        .into_response())
}
