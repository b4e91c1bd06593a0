//! The resource lifecycle state machine.
//!
//! [`ResourceLifecycle`] drives create, read, update, delete and their
//! variants on top of a [`VersionLog`]. Every write is a single append with an
//! explicit [`ExpectedVersion`], so a concurrent writer that got there first
//! turns the second write into a version conflict instead of a lost update.
//!
//! ```text
//!                 create / update (Created)
//!   Nonexistent ───────────────────────────▶ Active ◀──┐ update (Ok)
//!                                              │  └─────┘
//!                               delete         │    ▲
//!                             (NoContent)      ▼    │ update (Created)
//!                                            Deleted
//! ```
//!
//! Absence and deletion are outcomes ([`ReadOutcome::NotFound`],
//! [`ReadOutcome::Gone`]), not errors. The lifecycle does not log, retry or
//! shape responses; storage errors propagate unchanged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::core::{ExpectedVersion, VersionLog, VersionPayload};
use crate::error::{ConcurrencyError, ResourceError, StorageError, StorageResult};
use crate::types::{LifecycleState, LogicalResource, ResourceVersion, VersionMeta};

/// How the outcome of an operation is reported to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// A version was written and the resource was not active before.
    Created,
    /// The request succeeded.
    Ok,
    /// The request succeeded and there is nothing to return.
    NoContent,
    /// The resource or version does not exist.
    NotFound,
    /// The resource or version is a tombstone.
    Gone,
    /// The client's cached copy is still current.
    NotModified,
    /// The write lost a race or collided with an existing id.
    Conflict,
}

impl ResponseClass {
    /// Classifies a storage error, if it maps to a response class.
    pub fn from_error(err: &StorageError) -> Option<Self> {
        err.is_conflict().then_some(ResponseClass::Conflict)
    }
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    /// The resource or version exists and carries content.
    Found(T),
    /// Nothing exists under the id, version or kind.
    NotFound,
    /// The resource is deleted, or the version is a tombstone.
    Gone {
        /// When the resource was deleted.
        deleted_at: DateTime<Utc>,
        /// Number of the tombstone version.
        version: u64,
    },
}

impl<T> ReadOutcome<T> {
    /// Returns the response class of this outcome.
    pub fn response_class(&self) -> ResponseClass {
        match self {
            ReadOutcome::Found(_) => ResponseClass::Ok,
            ReadOutcome::NotFound => ResponseClass::NotFound,
            ReadOutcome::Gone { .. } => ResponseClass::Gone,
        }
    }

    /// Maps the found value, keeping the other outcomes.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOutcome<U> {
        match self {
            ReadOutcome::Found(value) => ReadOutcome::Found(f(value)),
            ReadOutcome::NotFound => ReadOutcome::NotFound,
            ReadOutcome::Gone {
                deleted_at,
                version,
            } => ReadOutcome::Gone {
                deleted_at,
                version,
            },
        }
    }

    /// Returns the found value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            ReadOutcome::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Result of create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// The version just written.
    pub version: ResourceVersion,
    /// True when the resource was nonexistent or deleted before the write.
    pub created: bool,
}

impl WriteOutcome {
    /// Returns [`ResponseClass::Created`] or [`ResponseClass::Ok`].
    pub fn response_class(&self) -> ResponseClass {
        if self.created {
            ResponseClass::Created
        } else {
            ResponseClass::Ok
        }
    }
}

/// Result of delete.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// A tombstone was appended.
    Deleted(ResourceVersion),
    /// The resource was nonexistent or already deleted; nothing was appended.
    NotFound,
}

impl DeleteOutcome {
    /// Returns [`ResponseClass::NoContent`] or [`ResponseClass::NotFound`].
    pub fn response_class(&self) -> ResponseClass {
        match self {
            DeleteOutcome::Deleted(_) => ResponseClass::NoContent,
            DeleteOutcome::NotFound => ResponseClass::NotFound,
        }
    }
}

/// Create, read, update and delete over a version log.
///
/// Every operation is scoped by resource kind. An id stored under another kind
/// reads as not found, and writing to it is a conflict, because ids are unique
/// across kinds.
#[derive(Debug)]
pub struct ResourceLifecycle<L> {
    log: Arc<L>,
}

impl<L> Clone for ResourceLifecycle<L> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

impl<L: VersionLog> ResourceLifecycle<L> {
    /// Creates a lifecycle over the given log.
    pub fn new(log: Arc<L>) -> Self {
        Self { log }
    }

    /// Returns the underlying log.
    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    /// Creates a resource under a fresh server-assigned id.
    pub async fn create(&self, resource_type: &str, content: Value) -> StorageResult<WriteOutcome> {
        let id = Uuid::new_v4().to_string();
        self.create_with_id(resource_type, &id, content).await
    }

    /// Creates a resource under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(AlreadyExists)` - If any version exists under `id`
    pub async fn create_with_id(
        &self,
        resource_type: &str,
        id: &str,
        content: Value,
    ) -> StorageResult<WriteOutcome> {
        let result = self
            .log
            .append(
                resource_type,
                id,
                VersionPayload::Content(content),
                ExpectedVersion::Exactly(0),
            )
            .await;

        match result {
            Ok(version) => Ok(WriteOutcome {
                version,
                created: true,
            }),
            Err(StorageError::Concurrency(ConcurrencyError::VersionConflict { .. })) => {
                Err(ResourceError::AlreadyExists {
                    resource_type: resource_type.to_string(),
                    id: id.to_string(),
                }
                .into())
            }
            Err(err) => Err(err),
        }
    }

    /// Reads the current version of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<ReadOutcome<ResourceVersion>> {
        let resource = match self.header(resource_type, id).await? {
            ReadOutcome::Found(resource) => resource,
            ReadOutcome::NotFound => return Ok(ReadOutcome::NotFound),
            ReadOutcome::Gone {
                deleted_at,
                version,
            } => {
                return Ok(ReadOutcome::Gone {
                    deleted_at,
                    version,
                });
            }
        };

        match self.log.get_version(id, resource.current_version()).await? {
            Some(version) => Ok(ReadOutcome::Found(version)),
            None => Err(dangling_pointer(&resource)),
        }
    }

    /// Reads the metadata of the current version without loading content.
    pub async fn read_meta(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<ReadOutcome<VersionMeta>> {
        Ok(self
            .header(resource_type, id)
            .await?
            .map(|resource| resource.meta()))
    }

    /// Reads one version of a resource.
    ///
    /// Versions stay readable after the resource is deleted; the tombstone
    /// version itself reads as gone.
    pub async fn read_version(
        &self,
        resource_type: &str,
        id: &str,
        version: u64,
    ) -> StorageResult<ReadOutcome<ResourceVersion>> {
        if !self.owns(resource_type, id).await? {
            return Ok(ReadOutcome::NotFound);
        }

        Ok(match self.log.get_version(id, version).await? {
            None => ReadOutcome::NotFound,
            Some(v) => match v.deleted_at() {
                Some(deleted_at) => ReadOutcome::Gone {
                    deleted_at,
                    version: v.version(),
                },
                None => ReadOutcome::Found(v),
            },
        })
    }

    /// Reads the metadata of one version without loading content.
    pub async fn read_version_meta(
        &self,
        resource_type: &str,
        id: &str,
        version: u64,
    ) -> StorageResult<ReadOutcome<VersionMeta>> {
        if !self.owns(resource_type, id).await? {
            return Ok(ReadOutcome::NotFound);
        }

        Ok(match self.log.get_version_info(id, version).await? {
            None => ReadOutcome::NotFound,
            Some(info) => match info.deleted_at() {
                Some(deleted_at) => ReadOutcome::Gone {
                    deleted_at,
                    version: info.version(),
                },
                None => ReadOutcome::Found(info.meta()),
            },
        })
    }

    /// Updates a resource, creating or reviving it as needed.
    ///
    /// `created` is true when the resource was nonexistent (upsert) or
    /// deleted (revive) before the write.
    ///
    /// # Errors
    ///
    /// * `StorageError::Concurrency(VersionConflict)` - If another write landed first
    /// * `StorageError::Resource(KindMismatch)` - If `id` belongs to another kind
    pub async fn update(
        &self,
        resource_type: &str,
        id: &str,
        content: Value,
    ) -> StorageResult<WriteOutcome> {
        let current = self.log.get_resource(id).await?;
        if let Some(resource) = &current {
            ensure_kind(resource, resource_type)?;
        }

        let state = LifecycleState::of(current.as_ref());
        let expected =
            ExpectedVersion::Exactly(current.as_ref().map_or(0, LogicalResource::current_version));

        let version = self
            .log
            .append(resource_type, id, VersionPayload::Content(content), expected)
            .await?;

        Ok(WriteOutcome {
            version,
            created: state != LifecycleState::Active,
        })
    }

    /// Deletes a resource by appending a tombstone.
    ///
    /// Deleting a nonexistent or already deleted resource appends nothing.
    pub async fn delete(&self, resource_type: &str, id: &str) -> StorageResult<DeleteOutcome> {
        let resource = match self.header(resource_type, id).await? {
            ReadOutcome::Found(resource) => resource,
            _ => return Ok(DeleteOutcome::NotFound),
        };

        let tombstone = self
            .log
            .append(
                resource_type,
                id,
                VersionPayload::Tombstone,
                ExpectedVersion::Exactly(resource.current_version()),
            )
            .await?;

        Ok(DeleteOutcome::Deleted(tombstone))
    }

    /// Lists every version of a resource, oldest first, tombstones included.
    ///
    /// Returns `None` when nothing exists under the id and kind.
    pub async fn history(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<Option<Vec<ResourceVersion>>> {
        if !self.owns(resource_type, id).await? {
            return Ok(None);
        }
        Ok(Some(self.log.list_versions(id).await?))
    }

    /// Returns the lifecycle state of a resource.
    pub async fn state(&self, resource_type: &str, id: &str) -> StorageResult<LifecycleState> {
        Ok(self
            .log
            .get_resource(id)
            .await?
            .filter(|r| r.is_kind(resource_type))
            .map_or(LifecycleState::Nonexistent, |r| r.state()))
    }

    async fn owns(&self, resource_type: &str, id: &str) -> StorageResult<bool> {
        Ok(self
            .log
            .get_resource(id)
            .await?
            .is_some_and(|r| r.is_kind(resource_type)))
    }

    /// Reads the header, folding kind mismatches into not found and
    /// tombstoned resources into gone.
    async fn header(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<ReadOutcome<LogicalResource>> {
        Ok(match self.log.get_resource(id).await? {
            Some(resource) if !resource.is_kind(resource_type) => ReadOutcome::NotFound,
            None => ReadOutcome::NotFound,
            Some(resource) => match resource.deleted_at() {
                Some(deleted_at) => ReadOutcome::Gone {
                    deleted_at,
                    version: resource.current_version(),
                },
                None => ReadOutcome::Found(resource),
            },
        })
    }
}

fn ensure_kind(resource: &LogicalResource, resource_type: &str) -> StorageResult<()> {
    if resource.is_kind(resource_type) {
        return Ok(());
    }
    Err(ResourceError::KindMismatch {
        id: resource.id().to_string(),
        existing_type: resource.resource_type().to_string(),
        requested_type: resource_type.to_string(),
    }
    .into())
}

fn dangling_pointer(resource: &LogicalResource) -> StorageError {
    crate::error::BackendError::Internal {
        backend_name: "lifecycle".to_string(),
        message: format!(
            "current pointer of {}/{} references missing version {}",
            resource.resource_type(),
            resource.id(),
            resource.current_version()
        ),
        source: None,
    }
    .into()
}
