//! Response header generation.
//!
//! Turns the validators of a version into `ETag` and `Last-Modified`
//! headers, and adds `Location` for writes.

use axum::http::{HeaderMap, HeaderValue, header};
use quill_persistence::conditional::Validators;

/// Media type of every resource body.
pub const RESOURCE_CONTENT_TYPE: &str = "application/fhir+json";

/// Builder for resource response headers.
///
/// Generates:
/// - ETag (weak validator)
/// - Last-Modified
/// - Location (for writes)
/// - Content-Type
#[derive(Debug, Default)]
pub struct ResourceHeaders {
    /// ETag value (weak validator).
    etag: Option<String>,
    /// Last-Modified timestamp, IMF-fixdate.
    last_modified: Option<String>,
    /// Location URL (for written resources).
    location: Option<String>,
    /// Content-Type, absent for bodiless responses.
    content_type: Option<String>,
}

impl ResourceHeaders {
    /// Creates a new ResourceHeaders builder.
    pub fn new() -> Self {
        Self {
            content_type: Some(RESOURCE_CONTENT_TYPE.to_string()),
            ..Default::default()
        }
    }

    /// Creates headers from the validators of a version.
    pub fn from_validators(validators: &Validators) -> Self {
        Self {
            etag: Some(validators.etag.to_string()),
            last_modified: Some(validators.http_last_modified()),
            ..Self::new()
        }
    }

    /// Sets the Location URL.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Drops the Content-Type, for responses without a body.
    pub fn without_content_type(mut self) -> Self {
        self.content_type = None;
        self
    }

    /// Converts to an Axum HeaderMap.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let entries = [
            (header::CONTENT_TYPE, &self.content_type),
            (header::ETAG, &self.etag),
            (header::LAST_MODIFIED, &self.last_modified),
            (header::LOCATION, &self.location),
        ];
        for (name, value) in entries {
            if let Some(value) = value.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(name, value);
            }
        }

        headers
    }

    /// Returns the ETag value.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Returns the Last-Modified value.
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// Returns the Location value.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}
