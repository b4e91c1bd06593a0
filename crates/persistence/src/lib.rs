//! Quill Persistence Layer
//!
//! This crate stores clinical resources as append-only version logs. Every
//! write produces a new immutable version of a logical resource; a delete is a
//! tombstone version, and a later update revives the resource on top of it.
//!
//! # Architecture
//!
//! - [`core`] - The [`VersionLog`] and [`Backend`] traits
//! - [`backends`] - SQLite and in-memory implementations
//! - [`lifecycle`] - The create / read / update / delete state machine
//! - [`conditional`] - Entity tags, last-modified and read preconditions
//! - [`payload`] - Identity checks on incoming bodies
//! - [`types`] - Logical resources and versions
//! - [`error`] - Error types for all operations
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! The in-memory backend is always available.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use quill_persistence::backends::MemoryBackend;
//! use quill_persistence::lifecycle::{ReadOutcome, ResourceLifecycle, ResponseClass};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let lifecycle = ResourceLifecycle::new(Arc::new(MemoryBackend::new()));
//!
//! let created = lifecycle
//!     .update("Patient", "p1", json!({"gender": "female"}))
//!     .await?;
//! assert_eq!(created.response_class(), ResponseClass::Created);
//!
//! lifecycle.delete("Patient", "p1").await?;
//! assert!(matches!(
//!     lifecycle.read("Patient", "p1").await?,
//!     ReadOutcome::Gone { .. }
//! ));
//!
//! let revived = lifecycle.update("Patient", "p1", json!({"gender": "male"})).await?;
//! assert!(revived.created);
//! assert_eq!(revived.version.version(), 3);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod conditional;
pub mod core;
pub mod error;
pub mod lifecycle;
pub mod payload;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use types::{LifecycleState, LogicalResource, ResourceVersion, VersionInfo, VersionMeta};

// Re-export core traits
pub use core::{Backend, BackendKind, ExpectedVersion, VersionLog, VersionPayload};

pub use conditional::{ConditionalProtocol, Evaluation, Preconditions, Validators};
pub use lifecycle::{DeleteOutcome, ReadOutcome, ResourceLifecycle, ResponseClass, WriteOutcome};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
