//! Resource body extractor.
//!
//! Parses a JSON request body. Identity checks (`id`, `resourceType`) are left
//! to [`quill_persistence::payload`], which reports every problem at once.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::RestError;

/// Axum extractor for a JSON resource body.
///
/// A missing `Content-Type` is treated as JSON; any other non-JSON media type
/// is rejected with 415.
///
/// # Example
///
/// ```rust,ignore
/// use quill_rest::extractors::ResourceBody;
///
/// async fn create_handler(ResourceBody(resource): ResourceBody) {
///     println!("Resource type: {}", resource["resourceType"]);
/// }
/// ```
#[derive(Debug)]
pub struct ResourceBody(pub Value);

/// Error type for body extraction failures.
#[derive(Debug)]
pub enum ResourceBodyRejection {
    /// The body could not be read, e.g. it exceeded the size limit.
    Body(Response),
    /// JSON parsing failed.
    InvalidJson(String),
    /// Unsupported content type.
    UnsupportedMediaType(String),
}

impl IntoResponse for ResourceBodyRejection {
    fn into_response(self) -> Response {
        let error = match self {
            ResourceBodyRejection::Body(response) => return response,
            ResourceBodyRejection::InvalidJson(msg) => RestError::BadRequest {
                message: format!("Invalid JSON: {}", msg),
            },
            ResourceBodyRejection::UnsupportedMediaType(ct) => {
                RestError::UnsupportedMediaType { content_type: ct }
            }
        };
        error.into_response()
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

impl<S> FromRequest<S> for ResourceBody
where
    S: Send + Sync,
{
    type Rejection = ResourceBodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Check content type (must own the string before moving req)
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();

        if !is_json(&content_type) {
            return Err(ResourceBodyRejection::UnsupportedMediaType(content_type));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ResourceBodyRejection::Body(e.into_response()))?;

        serde_json::from_slice(&bytes)
            .map(ResourceBody)
            .map_err(|e| ResourceBodyRejection::InvalidJson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/Patient");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("application/fhir+json; charset=utf-8"));
        assert!(!is_json("application/fhir+xml"));
        assert!(!is_json("text/plain"));
    }

    #[tokio::test]
    async fn test_extracts_json_without_content_type() {
        let body = ResourceBody::from_request(request(None, r#"{"id": "p1"}"#), &())
            .await
            .unwrap();
        assert_eq!(body.0["id"], "p1");
    }

    #[tokio::test]
    async fn test_rejects_malformed_json() {
        let rejection = ResourceBody::from_request(
            request(Some("application/fhir+json"), "{not json"),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rejects_xml() {
        let rejection = ResourceBody::from_request(
            request(Some("application/fhir+xml"), "<Patient/>"),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}
