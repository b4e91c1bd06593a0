//! Core storage traits and abstractions.
//!
//! - [`Backend`] - Engine identity, schema initialization and health checks
//! - [`VersionLog`] - Append-only versions and the current pointer
//!
//! # Example: Implementing a Version Log
//!
//! ```ignore
//! use async_trait::async_trait;
//! use quill_persistence::core::{ExpectedVersion, VersionLog, VersionPayload, check_append};
//!
//! #[async_trait]
//! impl VersionLog for MyBackend {
//!     async fn append(
//!         &self,
//!         resource_type: &str,
//!         id: &str,
//!         payload: VersionPayload,
//!         expected: ExpectedVersion,
//!     ) -> StorageResult<ResourceVersion> {
//!         // lock the resource, then:
//!         let next = check_append(resource_type, id, current.as_ref(), expected)?;
//!         // persist version `next` and move the pointer in one step
//!     }
//!     // ...
//! }
//! ```

mod backend;
mod version_log;

pub use backend::{Backend, BackendKind};
pub use version_log::{
    ExpectedVersion, VersionLog, VersionPayload, check_append, next_published_at,
};
