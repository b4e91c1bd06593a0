//! Logical resources and their versions.
//!
//! A [`LogicalResource`] is the header row for one id: which kind it is, which
//! version is current and when it was touched. Each write produces an
//! immutable [`ResourceVersion`]; a version without content is a tombstone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a logical resource sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// No version has ever been appended for the id.
    Nonexistent,
    /// The current version carries content.
    Active,
    /// The current version is a tombstone.
    Deleted,
}

impl LifecycleState {
    /// Derives the state from an optional resource header.
    pub fn of(resource: Option<&LogicalResource>) -> Self {
        match resource {
            None => LifecycleState::Nonexistent,
            Some(r) if r.is_deleted() => LifecycleState::Deleted,
            Some(_) => LifecycleState::Active,
        }
    }
}

/// The denormalized header of a logical resource.
///
/// Every field except `id`, `resource_type` and `first_published_at` moves
/// only as a side effect of an append to the version log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalResource {
    id: String,
    resource_type: String,
    current_version: u64,
    first_published_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl LogicalResource {
    /// Builds a header from persisted values.
    pub fn from_storage(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        current_version: u64,
        first_published_at: DateTime<Utc>,
        last_updated: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            current_version,
            first_published_at,
            last_updated,
            deleted_at,
        }
    }

    /// Returns the logical id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the resource kind, e.g. `Patient`.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the number of the current version.
    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    /// Returns when the first version was published.
    pub fn first_published_at(&self) -> DateTime<Utc> {
        self.first_published_at
    }

    /// Returns when the current version was published.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Returns when the resource entered the deleted state, if it is deleted.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns true if the current version is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the lifecycle state of this resource.
    pub fn state(&self) -> LifecycleState {
        LifecycleState::of(Some(self))
    }

    /// Returns the metadata of the current version.
    pub fn meta(&self) -> VersionMeta {
        VersionMeta {
            version: self.current_version,
            last_updated: self.last_updated,
        }
    }

    /// Returns true if the resource belongs to the given kind.
    pub fn is_kind(&self, resource_type: &str) -> bool {
        self.resource_type == resource_type
    }

    /// Moves the header onto a freshly appended version.
    pub(crate) fn advance(&mut self, version: &VersionInfo) {
        self.current_version = version.version;
        self.last_updated = version.published_at;
        self.deleted_at = version.deleted_at;
    }
}

/// The two values conditional requests are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMeta {
    /// The version number.
    pub version: u64,
    /// When the version was published.
    pub last_updated: DateTime<Utc>,
}

/// Everything about a version except its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    resource_id: String,
    resource_type: String,
    version: u64,
    published_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl VersionInfo {
    /// Builds version metadata from persisted values.
    pub fn from_storage(
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        version: u64,
        published_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            version,
            published_at,
            deleted_at,
        }
    }

    /// Returns the id of the owning resource.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Returns the kind of the owning resource.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns when this version was published.
    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    /// Returns the deletion instant for tombstones.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns true if this version is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the conditional-request metadata of this version.
    pub fn meta(&self) -> VersionMeta {
        VersionMeta {
            version: self.version,
            last_updated: self.published_at,
        }
    }
}

/// One immutable entry of a resource's version log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceVersion {
    #[serde(flatten)]
    info: VersionInfo,
    content: Option<Value>,
}

impl ResourceVersion {
    /// Pairs version metadata with its content (`None` for a tombstone).
    pub fn new(info: VersionInfo, content: Option<Value>) -> Self {
        Self { info, content }
    }

    /// Returns the metadata part of the version.
    pub fn info(&self) -> &VersionInfo {
        &self.info
    }

    /// Returns the id of the owning resource.
    pub fn resource_id(&self) -> &str {
        self.info.resource_id()
    }

    /// Returns the kind of the owning resource.
    pub fn resource_type(&self) -> &str {
        self.info.resource_type()
    }

    /// Returns the version number.
    pub fn version(&self) -> u64 {
        self.info.version()
    }

    /// Returns when this version was published.
    pub fn published_at(&self) -> DateTime<Utc> {
        self.info.published_at()
    }

    /// Returns the deletion instant for tombstones.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.info.deleted_at()
    }

    /// Returns true if this version is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.info.is_tombstone()
    }

    /// Returns the stored content, or `None` for a tombstone.
    pub fn content(&self) -> Option<&Value> {
        self.content.as_ref()
    }

    /// Consumes the version and returns its content.
    pub fn into_content(self) -> Option<Value> {
        self.content
    }

    /// Returns the conditional-request metadata of this version.
    pub fn meta(&self) -> VersionMeta {
        self.info.meta()
    }

    /// Returns the relative URL of this version, `Patient/1/_history/2`.
    pub fn versioned_url(&self) -> String {
        format!(
            "{}/{}/_history/{}",
            self.resource_type(),
            self.resource_id(),
            self.version()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header(deleted: bool) -> LogicalResource {
        let now = Utc::now();
        LogicalResource::from_storage(
            "p1",
            "Patient",
            3,
            now,
            now,
            deleted.then_some(now),
        )
    }

    #[test]
    fn test_state_derivation() {
        assert_eq!(LifecycleState::of(None), LifecycleState::Nonexistent);
        assert_eq!(header(false).state(), LifecycleState::Active);
        assert_eq!(header(true).state(), LifecycleState::Deleted);
    }

    #[test]
    fn test_advance_clears_deleted_at() {
        let mut resource = header(true);
        let published = resource.last_updated() + chrono::Duration::seconds(1);
        let info = VersionInfo::from_storage("p1", "Patient", 4, published, None);
        resource.advance(&info);

        assert_eq!(resource.current_version(), 4);
        assert_eq!(resource.last_updated(), published);
        assert!(!resource.is_deleted());
    }

    #[test]
    fn test_tombstone_has_no_content() {
        let now = Utc::now();
        let tombstone = ResourceVersion::new(
            VersionInfo::from_storage("p1", "Patient", 2, now, Some(now)),
            None,
        );
        assert!(tombstone.is_tombstone());
        assert!(tombstone.content().is_none());

        let live = ResourceVersion::new(
            VersionInfo::from_storage("p1", "Patient", 1, now, None),
            Some(json!({"active": true})),
        );
        assert!(!live.is_tombstone());
        assert_eq!(live.versioned_url(), "Patient/p1/_history/1");
        assert_eq!(live.meta().version, 1);
    }
}
