//! Axum extractors for request bodies.
//!
//! - [`ResourceBody`] - Extract a JSON resource body

mod resource_body;

pub use resource_body::{ResourceBody, ResourceBodyRejection};
