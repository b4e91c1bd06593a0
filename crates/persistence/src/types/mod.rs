//! Core types for the persistence layer.
//!
//! - [`LogicalResource`] - The header of a resource: kind, current version, timestamps
//! - [`ResourceVersion`] - One immutable version, with content or as a tombstone
//! - [`VersionInfo`] - A version without its content
//! - [`VersionMeta`] - Version number and publication instant
//! - [`LifecycleState`] - Nonexistent, active or deleted

mod resource;

pub use resource::{LifecycleState, LogicalResource, ResourceVersion, VersionInfo, VersionMeta};
