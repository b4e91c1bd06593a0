//! VersionLog implementation for SQLite.
//!
//! An append runs inside an IMMEDIATE transaction, which takes the database
//! write lock up front. Within it the expected version is checked against the
//! header row, the version row is inserted, and the header is moved with a
//! compare-and-increment `UPDATE ... WHERE version_id = ?`. A header that
//! moved underneath us, or a duplicate `(resource_id, version_id)` key,
//! surfaces as a version conflict and the transaction rolls back.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{
    ExpectedVersion, VersionLog, VersionPayload, check_append, next_published_at,
};
use crate::error::{BackendError, ConcurrencyError, StorageError, StorageResult};
use crate::types::{LogicalResource, ResourceVersion, VersionInfo};

use super::SqliteBackend;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| serialization_error(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_optional_timestamp(value: Option<String>) -> StorageResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

fn to_version_number(raw: i64) -> StorageResult<u64> {
    u64::try_from(raw).map_err(|_| internal_error(format!("Negative version number: {}", raw)))
}

fn to_sql_version(version: u64) -> StorageResult<i64> {
    i64::try_from(version)
        .map_err(|_| internal_error(format!("Version number out of range: {}", version)))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

struct ResourceRow {
    resource_type: String,
    version_id: i64,
    first_published_at: String,
    last_updated: String,
    deleted_at: Option<String>,
}

impl ResourceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            resource_type: row.get(0)?,
            version_id: row.get(1)?,
            first_published_at: row.get(2)?,
            last_updated: row.get(3)?,
            deleted_at: row.get(4)?,
        })
    }

    fn into_resource(self, id: &str) -> StorageResult<LogicalResource> {
        Ok(LogicalResource::from_storage(
            id,
            self.resource_type,
            to_version_number(self.version_id)?,
            parse_timestamp(&self.first_published_at)?,
            parse_timestamp(&self.last_updated)?,
            parse_optional_timestamp(self.deleted_at)?,
        ))
    }
}

struct HistoryRow {
    version_id: i64,
    resource_type: String,
    data: Option<Vec<u8>>,
    published_at: String,
    deleted_at: Option<String>,
}

impl HistoryRow {
    /// Maps `version_id, resource_type, data, published_at, deleted_at`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            version_id: row.get(0)?,
            resource_type: row.get(1)?,
            data: row.get(2)?,
            published_at: row.get(3)?,
            deleted_at: row.get(4)?,
        })
    }

    fn info(&self, id: &str) -> StorageResult<VersionInfo> {
        Ok(VersionInfo::from_storage(
            id,
            self.resource_type.clone(),
            to_version_number(self.version_id)?,
            parse_timestamp(&self.published_at)?,
            parse_optional_timestamp(self.deleted_at.clone())?,
        ))
    }

    fn into_version(self, id: &str) -> StorageResult<ResourceVersion> {
        let info = self.info(id)?;
        let content = match self.data {
            Some(bytes) => Some(
                serde_json::from_slice::<Value>(&bytes)
                    .map_err(|e| serialization_error(format!("Failed to parse resource: {}", e)))?,
            ),
            None => None,
        };
        Ok(ResourceVersion::new(info, content))
    }
}

fn load_resource(conn: &Connection, id: &str) -> StorageResult<Option<LogicalResource>> {
    let row = conn
        .query_row(
            "SELECT resource_type, version_id, first_published_at, last_updated, deleted_at
             FROM resources WHERE id = ?1",
            params![id],
            ResourceRow::from_row,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read resource: {}", e)))?;

    row.map(|r| r.into_resource(id)).transpose()
}

fn append_in_transaction(
    conn: &mut Connection,
    resource_type: &str,
    id: &str,
    payload: VersionPayload,
    expected: ExpectedVersion,
) -> StorageResult<ResourceVersion> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

    let current = load_resource(&tx, id)?;
    let next = check_append(resource_type, id, current.as_ref(), expected)?;
    let published_at = next_published_at(current.as_ref().map(LogicalResource::last_updated));
    let deleted_at = payload.is_tombstone().then_some(published_at);
    let published_text = format_timestamp(published_at);
    let deleted_text = deleted_at.map(format_timestamp);

    let conflict = |actual: u64| {
        StorageError::Concurrency(ConcurrencyError::VersionConflict {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
            expected_version: next - 1,
            actual_version: actual,
        })
    };

    if current.is_none() {
        tx.execute(
            "INSERT INTO resources (id, resource_type, version_id, first_published_at, last_updated, deleted_at)
             VALUES (?1, ?2, 0, ?3, ?3, NULL)",
            params![id, resource_type, published_text],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                conflict(0)
            } else {
                internal_error(format!("Failed to insert resource: {}", e))
            }
        })?;
    }

    let content = payload.into_content();
    let data = content
        .as_ref()
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|e| serialization_error(format!("Failed to serialize resource: {}", e)))?;
    let next_sql = to_sql_version(next)?;

    tx.execute(
        "INSERT INTO resource_history (resource_id, version_id, resource_type, data, published_at, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, next_sql, resource_type, data, published_text, deleted_text],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            conflict(next)
        } else {
            internal_error(format!("Failed to insert version: {}", e))
        }
    })?;

    let moved = tx
        .execute(
            "UPDATE resources SET version_id = ?1, last_updated = ?2, deleted_at = ?3
             WHERE id = ?4 AND version_id = ?5",
            params![next_sql, published_text, deleted_text, id, next_sql - 1],
        )
        .map_err(|e| internal_error(format!("Failed to move current pointer: {}", e)))?;
    if moved != 1 {
        return Err(conflict(next));
    }

    tx.commit()
        .map_err(|e| internal_error(format!("Failed to commit append: {}", e)))?;

    let info = VersionInfo::from_storage(id, resource_type, next, published_at, deleted_at);
    Ok(ResourceVersion::new(info, content))
}

const HISTORY_COLUMNS: &str = "version_id, resource_type, data, published_at, deleted_at";

#[async_trait]
impl VersionLog for SqliteBackend {
    async fn append(
        &self,
        resource_type: &str,
        id: &str,
        payload: VersionPayload,
        expected: ExpectedVersion,
    ) -> StorageResult<ResourceVersion> {
        let owned_type = resource_type.to_string();
        let owned_id = id.to_string();

        let result = self
            .with_connection(move |conn| {
                append_in_transaction(conn, &owned_type, &owned_id, payload, expected)
            })
            .await;

        match &result {
            Ok(version) => debug!(
                resource_type = %resource_type,
                id = %id,
                version = version.version(),
                tombstone = version.is_tombstone(),
                "Appended version"
            ),
            Err(StorageError::Concurrency(err)) => warn!(
                resource_type = %resource_type,
                id = %id,
                error = %err,
                "Append lost against a concurrent writer"
            ),
            Err(_) => {}
        }
        result
    }

    async fn get_resource(&self, id: &str) -> StorageResult<Option<LogicalResource>> {
        let id = id.to_string();
        self.with_connection(move |conn| load_resource(conn, &id))
            .await
    }

    async fn get_version(&self, id: &str, version: u64) -> StorageResult<Option<ResourceVersion>> {
        let id = id.to_string();
        let version = to_sql_version(version)?;
        self.with_connection(move |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM resource_history WHERE resource_id = ?1 AND version_id = ?2",
                        HISTORY_COLUMNS
                    ),
                    params![id, version],
                    HistoryRow::from_row,
                )
                .optional()
                .map_err(|e| internal_error(format!("Failed to read version: {}", e)))?;
            row.map(|r| r.into_version(&id)).transpose()
        })
        .await
    }

    async fn get_version_info(&self, id: &str, version: u64) -> StorageResult<Option<VersionInfo>> {
        let id = id.to_string();
        let version = to_sql_version(version)?;
        self.with_connection(move |conn| {
            let row = conn
                .query_row(
                    "SELECT version_id, resource_type, NULL, published_at, deleted_at
                     FROM resource_history WHERE resource_id = ?1 AND version_id = ?2",
                    params![id, version],
                    HistoryRow::from_row,
                )
                .optional()
                .map_err(|e| internal_error(format!("Failed to read version: {}", e)))?;
            row.map(|r| r.info(&id)).transpose()
        })
        .await
    }

    async fn list_versions(&self, id: &str) -> StorageResult<Vec<ResourceVersion>> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM resource_history WHERE resource_id = ?1 ORDER BY version_id ASC",
                    HISTORY_COLUMNS
                ))
                .map_err(|e| internal_error(format!("Failed to prepare history query: {}", e)))?;
            let rows = stmt
                .query_map(params![id], HistoryRow::from_row)
                .map_err(|e| internal_error(format!("Failed to query history: {}", e)))?;

            let mut versions = Vec::new();
            for row in rows {
                let row = row.map_err(|e| internal_error(format!("Failed to read history row: {}", e)))?;
                versions.push(row.into_version(&id)?);
            }
            Ok(versions)
        })
        .await
    }
}
