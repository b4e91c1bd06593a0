//! SQLite backend implementation.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::core::{Backend, BackendKind};
use crate::error::{BackendError, StorageError, StorageResult};

use super::schema;

/// SQLite backend for versioned resource storage.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool. In-memory databases always use one.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(":memory:", SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based SQLite database.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Creates a backend with custom configuration.
    ///
    /// An in-memory database exists once per connection, so the pool is
    /// pinned to a single connection that never expires.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteBackendConfig,
    ) -> StorageResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        };
        let init_config = config.clone();
        let manager = manager
            .with_init(move |conn| configure_connection(conn, &init_config, is_memory));

        let mut builder = Pool::builder().connection_timeout(Duration::from_millis(
            config.connection_timeout_ms,
        ));
        builder = if is_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections))
        };

        let pool = builder.build(manager).map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })?;

        tracing::debug!(
            is_memory,
            max_connections = pool.max_size(),
            "Opened SQLite pool"
        );

        Ok(Self {
            pool,
            config,
            is_memory,
        })
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(
        &self,
    ) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })
    }

    /// Runs blocking database work on the blocking thread pool.
    ///
    /// The connection is checked out inside the task and returned to the pool
    /// when `f` finishes.
    pub(crate) async fn with_connection<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: "sqlite".to_string(),
                    message: e.to_string(),
                })
            })?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| {
            StorageError::Backend(BackendError::Internal {
                backend_name: "sqlite".to_string(),
                message: format!("Blocking task failed: {}", e),
                source: Some(Box::new(e)),
            })
        })?
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }
}

/// Applies per-connection settings. Runs for every connection the pool opens.
fn configure_connection(
    conn: &mut Connection,
    config: &SqliteBackendConfig,
    is_memory: bool,
) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms as u64))?;

    if config.enable_foreign_keys {
        conn.pragma_update(None, "foreign_keys", true)?;
    }

    if config.enable_wal && !is_memory {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    }

    Ok(())
}

#[async_trait]
impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(())).map_err(|e| {
                StorageError::Backend(BackendError::Internal {
                    backend_name: "sqlite".to_string(),
                    message: format!("Health check failed: {}", e),
                    source: None,
                })
            })
        })
        .await
        .map_err(|e| match e {
            StorageError::Backend(BackendError::ConnectionFailed { message, .. }) => {
                BackendError::Unavailable {
                    backend_name: "sqlite".to_string(),
                    message,
                }
            }
            other => into_backend_error(other, "Health check failed"),
        })
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        self.with_connection(|conn| schema::initialize_schema(conn))
            .await
            .map_err(|e| into_backend_error(e, "Failed to initialize schema"))
    }
}

fn into_backend_error(err: StorageError, context: &str) -> BackendError {
    match err {
        StorageError::Backend(err) => err,
        other => BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: format!("{}: {}", context, other),
            source: Some(Box::new(other)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: SqliteBackendConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.enable_wal);
        assert!(config.enable_foreign_keys);
    }

    #[tokio::test]
    async fn test_in_memory_health_check() {
        let backend = SqliteBackend::in_memory().unwrap();
        assert!(backend.is_memory());
        backend.initialize().await.unwrap();
        backend.health_check().await.unwrap();
        assert_eq!(backend.kind(), BackendKind::Sqlite);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_health_check_waits_off_the_runtime_thread() {
        let config = SqliteBackendConfig {
            connection_timeout_ms: 2_000,
            ..Default::default()
        };
        let backend = SqliteBackend::with_config(":memory:", config).unwrap();

        // The in-memory pool has a single connection; hold it briefly.
        let held = backend.get_connection().unwrap();
        let release = async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(held);
        };

        let (result, ()) = tokio::join!(backend.health_check(), release);
        assert!(result.is_ok(), "health check failed: {:?}", result);
    }

    #[tokio::test]
    async fn test_in_memory_pool_shares_one_database() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();

        let count = backend
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM resources", [], |row| {
                    row.get::<_, i64>(0)
                })?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
