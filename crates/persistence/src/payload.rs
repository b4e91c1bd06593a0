//! Identity checks on incoming payloads.
//!
//! The store treats content as an opaque document, with two exceptions: `id`
//! and `meta` are server-managed and never persisted as sent, and an update
//! body must name the resource it updates.

use serde_json::{Map, Value};

use crate::error::{ValidationCode, ValidationDetail, ValidationError};

/// Prepares the body of a create for storage.
///
/// Any `id` or `meta` the client sent is discarded; the server assigns both.
pub fn prepare_create(resource_type: &str, content: Value) -> Result<Value, ValidationError> {
    let mut object = into_object(resource_type, content)?;
    if let Some(issue) = resource_type_issue(resource_type, &object) {
        return Err(invalid(vec![issue]));
    }
    strip_server_managed(&mut object);
    Ok(Value::Object(object))
}

/// Prepares the body of an update for storage.
///
/// The body must carry an `id` equal to `id` from the request path. Every
/// problem found is reported, not only the first.
pub fn prepare_update(
    resource_type: &str,
    id: &str,
    content: Value,
) -> Result<Value, ValidationError> {
    let mut object = into_object(resource_type, content)?;

    let mut issues = Vec::new();
    match object.get("id") {
        None | Some(Value::Null) => issues.push(ValidationDetail::error(
            ValidationCode::Required,
            format!("{}.id", resource_type),
            "The id element is missing.",
        )),
        Some(Value::String(body_id)) if body_id == id => {}
        Some(_) => issues.push(ValidationDetail::error(
            ValidationCode::Value,
            format!("{}.id", resource_type),
            "The id element disagrees with the id in the URL.",
        )),
    }
    issues.extend(resource_type_issue(resource_type, &object));

    if !issues.is_empty() {
        return Err(invalid(issues));
    }

    strip_server_managed(&mut object);
    Ok(Value::Object(object))
}

fn into_object(resource_type: &str, content: Value) -> Result<Map<String, Value>, ValidationError> {
    match content {
        Value::Object(object) => Ok(object),
        _ => Err(invalid(vec![ValidationDetail::error(
            ValidationCode::Structure,
            resource_type,
            "The resource must be a JSON object.",
        )])),
    }
}

fn resource_type_issue(resource_type: &str, object: &Map<String, Value>) -> Option<ValidationDetail> {
    match object.get("resourceType") {
        None => None,
        Some(Value::String(declared)) if declared == resource_type => None,
        Some(_) => Some(ValidationDetail::error(
            ValidationCode::Value,
            format!("{}.resourceType", resource_type),
            "The resourceType element disagrees with the type in the URL.",
        )),
    }
}

fn strip_server_managed(object: &mut Map<String, Value>) {
    object.remove("id");
    object.remove("meta");
}

fn invalid(details: Vec<ValidationDetail>) -> ValidationError {
    let message = details
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    ValidationError::InvalidResource { message, details }
}
