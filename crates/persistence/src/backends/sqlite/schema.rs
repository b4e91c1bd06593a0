//! SQLite schema definitions and versioning.

use rusqlite::Connection;

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(StorageError::Backend(BackendError::MigrationError {
            message: format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            ),
        }));
    }

    Ok(())
}

fn execute(conn: &Connection, sql: &str, what: &str) -> StorageResult<()> {
    conn.execute(sql, []).map_err(|e| {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: format!("Failed to {}: {}", what, e),
            source: None,
        })
    })?;
    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    execute(
        conn,
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        "create schema_version table",
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    execute(conn, "DELETE FROM schema_version", "clear schema_version")?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )
    .map_err(|e| {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: format!("Failed to set schema_version: {}", e),
            source: None,
        })
    })?;
    Ok(())
}

/// Create the initial schema (version 1).
///
/// `resources` holds one header row per logical resource; `resource_history`
/// holds every version, with a NULL `data` column marking a tombstone. The
/// `(resource_id, version_id)` primary key also serves "latest version of a
/// resource" lookups, so no secondary index is needed.
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    execute(
        conn,
        "CREATE TABLE IF NOT EXISTS resources (
            id TEXT NOT NULL PRIMARY KEY,
            resource_type TEXT NOT NULL,
            version_id INTEGER NOT NULL,
            first_published_at TEXT NOT NULL,
            last_updated TEXT NOT NULL,
            deleted_at TEXT
        )",
        "create resources table",
    )?;

    execute(
        conn,
        "CREATE TABLE IF NOT EXISTS resource_history (
            resource_id TEXT NOT NULL,
            version_id INTEGER NOT NULL,
            resource_type TEXT NOT NULL,
            data BLOB,
            published_at TEXT NOT NULL,
            deleted_at TEXT,
            PRIMARY KEY (resource_id, version_id),
            FOREIGN KEY (resource_id) REFERENCES resources(id)
        )",
        "create resource_history table",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = names(&conn, "table");
        assert!(tables.contains(&"resources".to_string()));
        assert!(tables.contains(&"resource_history".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));

        // Only the primary-key autoindexes; nothing is indexed for search.
        let indexes = names(&conn, "index");
        assert!(indexes.iter().all(|name| name.starts_with("sqlite_autoindex_")));
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        get_schema_version(&conn).unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::MigrationError { .. })
        ));
    }
}
