//! SQLite backend implementation.
//!
//! Supports both in-memory databases (useful for tests) and file-based
//! databases that survive restarts.
//!
//! # Example
//!
//! ```no_run
//! use quill_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create an in-memory database
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Initialize the schema
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- One header row per logical resource
//! CREATE TABLE resources (
//!     id TEXT NOT NULL PRIMARY KEY,
//!     resource_type TEXT NOT NULL,
//!     version_id INTEGER NOT NULL,      -- current pointer
//!     first_published_at TEXT NOT NULL,
//!     last_updated TEXT NOT NULL,
//!     deleted_at TEXT                   -- set while the current version is a tombstone
//! );
//!
//! -- Every version ever appended
//! CREATE TABLE resource_history (
//!     resource_id TEXT NOT NULL,
//!     version_id INTEGER NOT NULL,
//!     resource_type TEXT NOT NULL,
//!     data BLOB,                        -- JSON; NULL for tombstones
//!     published_at TEXT NOT NULL,
//!     deleted_at TEXT,
//!     PRIMARY KEY (resource_id, version_id)
//! );
//! ```

mod backend;
mod schema;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
