//! Conditional request header handling.
//!
//! Reads the headers that make a read conditional:
//! - If-None-Match: return 304 when the client already holds the current version
//! - If-Modified-Since: return 304 when nothing changed after the given date
//!
//! Unparseable values are ignored, as if the header were absent.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};
use quill_persistence::conditional::{IfNoneMatch, Preconditions, parse_http_date};

/// Extracted conditional headers from a request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConditionalHeaders {
    if_none_match: Option<IfNoneMatch>,
    if_modified_since: Option<DateTime<Utc>>,
}

impl ConditionalHeaders {
    /// Creates a new ConditionalHeaders from a HeaderMap.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_none_match = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .and_then(IfNoneMatch::parse);

        let if_modified_since = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        Self {
            if_none_match,
            if_modified_since,
        }
    }

    /// Returns the parsed If-None-Match header.
    pub fn if_none_match(&self) -> Option<&IfNoneMatch> {
        self.if_none_match.as_ref()
    }

    /// Returns the parsed If-Modified-Since header.
    pub fn if_modified_since(&self) -> Option<DateTime<Utc>> {
        self.if_modified_since
    }

    /// Checks if any conditional headers are present.
    pub fn has_conditions(&self) -> bool {
        self.if_none_match.is_some() || self.if_modified_since.is_some()
    }

    /// Converts the headers into preconditions for evaluation.
    pub fn into_preconditions(self) -> Preconditions {
        Preconditions {
            if_none_match: self.if_none_match,
            if_modified_since: self.if_modified_since,
        }
    }
}

/// Axum extractor for conditional headers.
impl<S> FromRequestParts<S> for ConditionalHeaders
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ConditionalHeaders::from_headers(&parts.headers))
    }
}
