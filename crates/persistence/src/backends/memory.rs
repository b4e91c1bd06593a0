//! In-memory backend.
//!
//! Each resource lives in its own slot behind its own mutex. The outer map is
//! locked only long enough to find or insert a slot, so appends on different
//! resources proceed in parallel while appends on one resource serialize.
//! Nothing is persisted; the log is lost when the backend is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::core::{
    Backend, BackendKind, ExpectedVersion, VersionLog, VersionPayload, check_append,
    next_published_at,
};
use crate::error::{BackendError, StorageResult};
use crate::types::{LogicalResource, ResourceVersion, VersionInfo};

#[derive(Debug, Default)]
struct ResourceSlot {
    header: Option<LogicalResource>,
    versions: Vec<ResourceVersion>,
}

impl ResourceSlot {
    fn version(&self, version: u64) -> Option<&ResourceVersion> {
        let index = usize::try_from(version.checked_sub(1)?).ok()?;
        self.versions.get(index)
    }
}

/// Process-local version log.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: RwLock<HashMap<String, Arc<Mutex<ResourceSlot>>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of ids that have at least one version.
    pub fn resource_count(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.lock().header.is_some())
            .count()
    }

    fn existing_slot(&self, id: &str) -> Option<Arc<Mutex<ResourceSlot>>> {
        self.slots.read().get(id).cloned()
    }

    fn slot(&self, id: &str) -> Arc<Mutex<ResourceSlot>> {
        if let Some(slot) = self.existing_slot(id) {
            return slot;
        }
        self.slots
            .write()
            .entry(id.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[async_trait]
impl VersionLog for MemoryBackend {
    async fn append(
        &self,
        resource_type: &str,
        id: &str,
        payload: VersionPayload,
        expected: ExpectedVersion,
    ) -> StorageResult<ResourceVersion> {
        // A rejected first append must not leave an empty slot behind.
        let slot = match self.existing_slot(id) {
            Some(slot) => slot,
            None => {
                check_append(resource_type, id, None, expected)?;
                self.slot(id)
            }
        };
        let mut slot = slot.lock();

        let next = check_append(resource_type, id, slot.header.as_ref(), expected)?;
        let published_at = next_published_at(slot.header.as_ref().map(|h| h.last_updated()));
        let deleted_at = payload.is_tombstone().then_some(published_at);

        let info = VersionInfo::from_storage(id, resource_type, next, published_at, deleted_at);
        match slot.header.as_mut() {
            Some(header) => header.advance(&info),
            None => {
                slot.header = Some(LogicalResource::from_storage(
                    id,
                    resource_type,
                    next,
                    published_at,
                    published_at,
                    deleted_at,
                ))
            }
        }

        let version = ResourceVersion::new(info, payload.into_content());
        slot.versions.push(version.clone());

        debug!(
            resource_type = %resource_type,
            id = %id,
            version = next,
            tombstone = version.is_tombstone(),
            "Appended version"
        );
        Ok(version)
    }

    async fn get_resource(&self, id: &str) -> StorageResult<Option<LogicalResource>> {
        Ok(self
            .existing_slot(id)
            .and_then(|slot| slot.lock().header.clone()))
    }

    async fn get_version(&self, id: &str, version: u64) -> StorageResult<Option<ResourceVersion>> {
        Ok(self
            .existing_slot(id)
            .and_then(|slot| slot.lock().version(version).cloned()))
    }

    async fn get_version_info(&self, id: &str, version: u64) -> StorageResult<Option<VersionInfo>> {
        Ok(self
            .existing_slot(id)
            .and_then(|slot| slot.lock().version(version).map(|v| v.info().clone())))
    }

    async fn list_versions(&self, id: &str) -> StorageResult<Vec<ResourceVersion>> {
        Ok(self
            .existing_slot(id)
            .map(|slot| slot.lock().versions.clone())
            .unwrap_or_default())
    }
}
