//! Resource representation building.
//!
//! Stored content never carries `id` or `meta`; both are server-managed and
//! injected here from the version being returned.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use quill_persistence::types::ResourceVersion;
use serde_json::{Map, Value};

/// Formats a timestamp as RFC 3339 with microseconds and a `Z` suffix.
pub fn format_instant(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Builds the representation of a version: its content plus `resourceType`,
/// `id` and `meta { versionId, lastUpdated }`.
///
/// Tombstones have no content and render as the bare identity.
pub fn resource_body(version: &ResourceVersion) -> Value {
    let mut body = match version.content() {
        Some(Value::Object(content)) => content.clone(),
        _ => Map::new(),
    };

    body.insert(
        "resourceType".to_string(),
        Value::String(version.resource_type().to_string()),
    );
    body.insert(
        "id".to_string(),
        Value::String(version.resource_id().to_string()),
    );
    body.insert(
        "meta".to_string(),
        serde_json::json!({
            "versionId": version.version().to_string(),
            "lastUpdated": format_instant(version.published_at()),
        }),
    );

    Value::Object(body)
}

/// Builds an HTTP response carrying the representation of `version`.
pub fn format_resource_response(
    status: StatusCode,
    headers: HeaderMap,
    version: &ResourceVersion,
) -> Response {
    (status, headers, axum::Json(resource_body(version))).into_response()
}
