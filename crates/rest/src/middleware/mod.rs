//! HTTP middleware for the Quill HTTP interface.
//!
//! - [`conditional`] - Conditional read headers (If-None-Match, If-Modified-Since)

pub mod conditional;

pub use conditional::ConditionalHeaders;
