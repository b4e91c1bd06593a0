//! Quill server
//!
//! Serves the versioned resource store over HTTP.

use clap::Parser;
use quill_persistence::backends::MemoryBackend;
use quill_persistence::core::Backend;
use quill_rest::{ServerConfig, StorageBackendMode, create_app_with_config, init_logging};
use tracing::{info, warn};

#[cfg(feature = "sqlite")]
use quill_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};

/// Creates and initializes a SQLite backend from the server configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_backend(config: &ServerConfig) -> anyhow::Result<SqliteBackend> {
    let db_path = config.database_path();
    info!(database = %db_path, "Initializing SQLite backend");

    let backend = SqliteBackend::with_config(db_path, SqliteBackendConfig::default())?;
    backend.init_schema()?;

    Ok(backend)
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, base_url = %config.base_url(), "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        storage_backend = %config.storage_backend,
        "Starting Quill server"
    );

    match config.storage_backend {
        StorageBackendMode::Sqlite => start_sqlite(config).await,
        StorageBackendMode::Memory => start_memory(config).await,
    }
}

/// Starts the server with the SQLite backend.
#[cfg(feature = "sqlite")]
async fn start_sqlite(config: ServerConfig) -> anyhow::Result<()> {
    if config.is_in_memory_database() {
        warn!("SQLite is running in memory; data is lost on shutdown");
    }
    let backend = create_sqlite_backend(&config)?;
    let app = create_app_with_config(backend, config.clone());
    serve(app, &config).await
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn start_sqlite(_config: ServerConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p quill-server --features sqlite, \
         or run with --storage-backend memory"
    )
}

/// Starts the server with the process-local backend.
async fn start_memory(config: ServerConfig) -> anyhow::Result<()> {
    warn!("Using the in-memory backend; data is lost on shutdown");
    let backend = MemoryBackend::new();
    backend.initialize().await?;
    let app = create_app_with_config(backend, config.clone());
    serve(app, &config).await
}
