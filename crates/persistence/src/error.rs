//! Error types for the persistence layer.
//!
//! Absence and deletion are not errors here: the lifecycle reports them as
//! outcomes. What remains are write conflicts, payload validation failures
//! and failures of the durable medium.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource identity errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Concurrency and versioning errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true when the error reports a write that lost against another
    /// writer or collided with an existing id.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::Concurrency(_)
                | StorageError::Resource(ResourceError::AlreadyExists { .. })
                | StorageError::Resource(ResourceError::KindMismatch { .. })
        )
    }
}

/// Errors related to resource identity.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A resource with the given ID already exists.
    #[error("resource already exists: {resource_type}/{id}")]
    AlreadyExists { resource_type: String, id: String },

    /// The id is already used by a resource of another kind.
    #[error("id {id} belongs to a {existing_type}, not a {requested_type}")]
    KindMismatch {
        id: String,
        existing_type: String,
        requested_type: String,
    },
}

/// Errors related to concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The current pointer moved between the read and the append.
    #[error("version conflict on {resource_type}/{id}: expected {expected_version}, found {actual_version}")]
    VersionConflict {
        resource_type: String,
        id: String,
        expected_version: u64,
        actual_version: u64,
    },
}

/// Errors related to resource validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The resource failed validation.
    #[error("invalid resource: {message}")]
    InvalidResource {
        message: String,
        details: Vec<ValidationDetail>,
    },
}

impl ValidationError {
    /// Returns the individual issues carried by this error.
    pub fn details(&self) -> &[ValidationDetail] {
        match self {
            ValidationError::InvalidResource { details, .. } => details,
        }
    }
}

/// Detailed validation error information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetail {
    /// The dotted path to the offending element, e.g. `Patient.id`.
    pub path: String,
    /// A human-readable error message.
    pub message: String,
    /// How serious the issue is.
    pub severity: ValidationSeverity,
    /// What kind of problem was found.
    pub code: ValidationCode,
}

impl ValidationDetail {
    /// Creates an error-severity detail.
    pub fn error(code: ValidationCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
            code,
        }
    }
}

/// Severity level for validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Fatal error - operation cannot proceed.
    Error,
    /// Warning - operation can proceed but with concerns.
    Warning,
    /// Informational - no action required.
    Information,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationSeverity::Error => write!(f, "error"),
            ValidationSeverity::Warning => write!(f, "warning"),
            ValidationSeverity::Information => write!(f, "information"),
        }
    }
}

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    /// A required element is missing.
    Required,
    /// An element holds the wrong value.
    Value,
    /// The payload is not a structured document.
    Structure,
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationCode::Required => write!(f, "required"),
            ValidationCode::Value => write!(f, "value"),
            ValidationCode::Structure => write!(f, "structure"),
        }
    }
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}
