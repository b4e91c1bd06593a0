//! The append-only version log.
//!
//! A [`VersionLog`] owns version numbering and the current pointer of every
//! logical resource. Versions are numbered from 1 without gaps, never rewritten
//! and never removed; the header of a resource only changes as a side effect of
//! [`VersionLog::append`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde_json::Value;

use crate::error::{ConcurrencyError, ResourceError, StorageResult};
use crate::types::{LogicalResource, ResourceVersion, VersionInfo};

use super::backend::Backend;

/// What a new version carries.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionPayload {
    /// A document that becomes the current content.
    Content(Value),
    /// A deletion marker.
    Tombstone,
}

impl VersionPayload {
    /// Returns true for [`VersionPayload::Tombstone`].
    pub fn is_tombstone(&self) -> bool {
        matches!(self, VersionPayload::Tombstone)
    }

    /// Returns the content, or `None` for a tombstone.
    pub fn into_content(self) -> Option<Value> {
        match self {
            VersionPayload::Content(value) => Some(value),
            VersionPayload::Tombstone => None,
        }
    }
}

/// The state of the current pointer an append expects to find.
///
/// `Exactly(0)` means "the resource must not exist yet". An append whose
/// expectation does not hold fails with a version conflict and writes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append on top of whatever is current.
    Any,
    /// Append only if the current version number equals this value.
    Exactly(u64),
}

/// Durable, append-only storage of resource versions.
///
/// # Atomicity
///
/// Implementations must make `append` atomic per resource: two appends on the
/// same id never receive the same number and never lose each other, and a
/// reader never observes a current pointer that references an uncommitted
/// version. Appends on different ids must not block each other for longer than
/// the engine's own write path requires.
///
/// # Timestamps
///
/// `published_at` of a new version is taken from the clock at append time and
/// is strictly later than that of the previous version of the same resource
/// (see [`next_published_at`]).
///
/// # Example
///
/// ```ignore
/// use quill_persistence::core::{ExpectedVersion, VersionLog, VersionPayload};
///
/// async fn example<L: VersionLog>(log: &L) -> StorageResult<()> {
///     let v1 = log
///         .append("Patient", "p1", VersionPayload::Content(json!({})), ExpectedVersion::Exactly(0))
///         .await?;
///     assert_eq!(v1.version(), 1);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait VersionLog: Backend {
    /// Appends a version to the resource identified by `id`.
    ///
    /// The first append creates the resource under `resource_type`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Concurrency(VersionConflict)` - If `expected` does not hold
    /// * `StorageError::Resource(KindMismatch)` - If `id` belongs to another kind
    /// * `StorageError::Backend` - If the durable medium fails
    async fn append(
        &self,
        resource_type: &str,
        id: &str,
        payload: VersionPayload,
        expected: ExpectedVersion,
    ) -> StorageResult<ResourceVersion>;

    /// Reads the header of a resource without loading any content.
    async fn get_resource(&self, id: &str) -> StorageResult<Option<LogicalResource>>;

    /// Reads one version including its content.
    async fn get_version(&self, id: &str, version: u64) -> StorageResult<Option<ResourceVersion>>;

    /// Reads one version without loading its content.
    async fn get_version_info(&self, id: &str, version: u64) -> StorageResult<Option<VersionInfo>>;

    /// Reads the version the current pointer references.
    async fn get_current(&self, id: &str) -> StorageResult<Option<ResourceVersion>> {
        match self.get_resource(id).await? {
            Some(resource) => self.get_version(id, resource.current_version()).await,
            None => Ok(None),
        }
    }

    /// Lists every version of a resource, oldest first.
    ///
    /// Returns an empty vector for unknown ids.
    async fn list_versions(&self, id: &str) -> StorageResult<Vec<ResourceVersion>>;
}

/// Checks an append against the resource as it currently stands.
///
/// Returns the version number the append will receive.
pub fn check_append(
    resource_type: &str,
    id: &str,
    current: Option<&LogicalResource>,
    expected: ExpectedVersion,
) -> StorageResult<u64> {
    if let Some(resource) = current {
        if !resource.is_kind(resource_type) {
            return Err(ResourceError::KindMismatch {
                id: id.to_string(),
                existing_type: resource.resource_type().to_string(),
                requested_type: resource_type.to_string(),
            }
            .into());
        }
    }

    let actual = current.map_or(0, LogicalResource::current_version);
    if let ExpectedVersion::Exactly(expected_version) = expected {
        if expected_version != actual {
            return Err(ConcurrencyError::VersionConflict {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
                expected_version,
                actual_version: actual,
            }
            .into());
        }
    }

    Ok(actual + 1)
}

/// Returns the publication instant for a new version.
///
/// Timestamps are kept at microsecond precision so they survive a round trip
/// through text storage unchanged, and are bumped past `previous` when the
/// clock has not advanced.
pub fn next_published_at(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    let now = now.duration_trunc(Duration::microseconds(1)).unwrap_or(now);
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
