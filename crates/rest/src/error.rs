//! Error types for the Quill HTTP interface.
//!
//! This module defines all error types used throughout the HTTP layer,
//! with automatic conversion to OperationOutcome responses.
//!
//! # Error Mapping
//!
//! Storage errors from the persistence layer are mapped to HTTP status codes
//! and issue codes:
//!
//! | Storage Error | HTTP Status | Issue Code |
//! |--------------|-------------|-----------------|
//! | AlreadyExists | 409 | conflict |
//! | KindMismatch | 409 | conflict |
//! | VersionConflict | 409 | conflict |
//! | InvalidResource | 400 | per issue (required, value, structure) |
//! | Unavailable / ConnectionFailed | 503 | transient |
//! | other BackendError | 500 | exception |

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quill_persistence::error::{
    BackendError, ConcurrencyError, ResourceError, StorageError, ValidationCode, ValidationDetail,
    ValidationError, ValidationSeverity,
};

use crate::responses::operation_outcome::{Issue, IssueSeverity, IssueType, OperationOutcomeBuilder};

/// The primary error type for HTTP operations.
///
/// This enum provides semantic error types that map cleanly to HTTP status codes
/// and OperationOutcome issue codes.
#[derive(Debug)]
pub enum RestError {
    /// Resource not found (HTTP 404).
    NotFound {
        /// The resource type (e.g., "Patient").
        resource_type: String,
        /// The resource ID.
        id: String,
    },

    /// Resource was deleted (HTTP 410 Gone).
    Gone {
        /// The resource type.
        resource_type: String,
        /// The resource ID.
        id: String,
    },

    /// Version not found for a version read (HTTP 404).
    VersionNotFound {
        /// The resource type.
        resource_type: String,
        /// The resource ID.
        id: String,
        /// The version ID, as it appeared in the URL.
        version_id: String,
    },

    /// The requested version is a tombstone (HTTP 410 Gone).
    VersionGone {
        /// The resource type.
        resource_type: String,
        /// The resource ID.
        id: String,
        /// The version number of the tombstone.
        version_id: u64,
    },

    /// Write collided with another writer or an existing id (HTTP 409).
    Conflict {
        /// Message describing the conflict.
        message: String,
    },

    /// Body failed identity checks (HTTP 400), one issue per problem.
    Validation {
        /// Every problem found in the body.
        issues: Vec<ValidationDetail>,
    },

    /// Bad request - malformed input (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Body is not JSON (HTTP 415).
    UnsupportedMediaType {
        /// The unsupported content type.
        content_type: String,
    },

    /// The backend failed its health check (HTTP 503).
    ServiceUnavailable {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::NotFound { resource_type, id } => {
                write!(f, "Resource not found: {}/{}", resource_type, id)
            }
            RestError::Gone { resource_type, id } => {
                write!(f, "Resource deleted: {}/{}", resource_type, id)
            }
            RestError::VersionNotFound {
                resource_type,
                id,
                version_id,
            } => {
                write!(
                    f,
                    "Version not found: {}/{}/_history/{}",
                    resource_type, id, version_id
                )
            }
            RestError::VersionGone {
                resource_type,
                id,
                version_id,
            } => {
                write!(
                    f,
                    "Version deleted: {}/{}/_history/{}",
                    resource_type, id, version_id
                )
            }
            RestError::Conflict { message } => write!(f, "Conflict: {}", message),
            RestError::Validation { issues } => {
                write!(f, "Invalid resource: {} issue(s)", issues.len())
            }
            RestError::BadRequest { message } => write!(f, "Bad request: {}", message),
            RestError::UnsupportedMediaType { content_type } => {
                write!(f, "Unsupported media type: {}", content_type)
            }
            RestError::ServiceUnavailable { message } => {
                write!(f, "Service unavailable: {}", message)
            }
            RestError::InternalError { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl RestError {
    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NotFound { .. } | RestError::VersionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RestError::Gone { .. } | RestError::VersionGone { .. } => StatusCode::GONE,
            RestError::Conflict { .. } => StatusCode::CONFLICT,
            RestError::Validation { .. } | RestError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            RestError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RestError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the OperationOutcome body for this error.
    pub fn to_operation_outcome(&self) -> serde_json::Value {
        let outcome = OperationOutcomeBuilder::new();
        let outcome = match self {
            RestError::NotFound { resource_type, id } => outcome.error(
                IssueType::NotFound,
                format!("Resource {}/{} not found", resource_type, id),
            ),
            RestError::Gone { .. } | RestError::VersionGone { .. } => outcome.error(
                IssueType::Deleted,
                "The resource requested is no longer available.",
            ),
            RestError::VersionNotFound {
                resource_type,
                id,
                version_id,
            } => outcome.error(
                IssueType::NotFound,
                format!(
                    "Version {} of {}/{} not found",
                    version_id, resource_type, id
                ),
            ),
            RestError::Conflict { message } => outcome.error(IssueType::Conflict, message.clone()),
            RestError::Validation { issues } => issues
                .iter()
                .fold(outcome, |outcome, detail| outcome.add_issue(issue_for(detail))),
            RestError::BadRequest { message } => {
                outcome.error(IssueType::Invalid, message.clone())
            }
            RestError::UnsupportedMediaType { content_type } => outcome.error(
                IssueType::NotSupported,
                format!("Content type '{}' is not supported", content_type),
            ),
            RestError::ServiceUnavailable { message } => {
                outcome.error(IssueType::Transient, message.clone())
            }
            RestError::InternalError { message } => {
                outcome.error(IssueType::Exception, message.clone())
            }
        };
        outcome.build()
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (self.status(), Json(self.to_operation_outcome())).into_response()
    }
}

fn issue_for(detail: &ValidationDetail) -> Issue {
    let severity = match detail.severity {
        ValidationSeverity::Error => IssueSeverity::Error,
        ValidationSeverity::Warning => IssueSeverity::Warning,
        ValidationSeverity::Information => IssueSeverity::Information,
    };
    let code = match detail.code {
        ValidationCode::Required => IssueType::Required,
        ValidationCode::Value => IssueType::Value,
        ValidationCode::Structure => IssueType::Structure,
    };
    Issue::new(severity, code, detail.message.clone()).with_expression(detail.path.clone())
}

// Implement conversions from storage errors

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Resource(e) => e.into(),
            StorageError::Concurrency(e) => e.into(),
            StorageError::Validation(e) => e.into(),
            StorageError::Backend(e) => e.into(),
        }
    }
}

impl From<ResourceError> for RestError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::AlreadyExists { resource_type, id } => RestError::Conflict {
                message: format!("Resource {}/{} already exists", resource_type, id),
            },
            ResourceError::KindMismatch { .. } => RestError::Conflict {
                message: err.to_string(),
            },
        }
    }
}

impl From<ConcurrencyError> for RestError {
    fn from(err: ConcurrencyError) -> Self {
        match err {
            ConcurrencyError::VersionConflict {
                resource_type,
                id,
                expected_version,
                actual_version,
            } => RestError::Conflict {
                message: format!(
                    "Resource {}/{} changed concurrently: expected version {}, but found {}",
                    resource_type, id, expected_version, actual_version
                ),
            },
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidResource { message, details } if details.is_empty() => {
                RestError::BadRequest { message }
            }
            ValidationError::InvalidResource { details, .. } => {
                RestError::Validation { issues: details }
            }
        }
    }
}

impl From<BackendError> for RestError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable { .. } | BackendError::ConnectionFailed { .. } => {
                RestError::ServiceUnavailable {
                    message: err.to_string(),
                }
            }
            _ => RestError::InternalError {
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::BadRequest {
            message: format!("Invalid JSON: {}", err),
        }
    }
}

/// Result type alias for HTTP operations.
pub type RestResult<T> = Result<T, RestError>;
