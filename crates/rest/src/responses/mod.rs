//! Response formatting for the HTTP interface.
//!
//! - [`operation_outcome`] - OperationOutcome generation
//! - [`bundle`] - History bundle building
//! - [`headers`] - Response header generation (ETag, Last-Modified, Location)
//! - [`format`] - Resource representations

pub mod bundle;
pub mod format;
pub mod headers;
pub mod operation_outcome;

pub use bundle::{BundleBuilder, history_bundle};
pub use format::{format_resource_response, resource_body};
pub use headers::ResourceHeaders;
pub use operation_outcome::OperationOutcomeBuilder;
