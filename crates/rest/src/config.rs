//! Server configuration for the Quill HTTP interface.
//!
//! This module provides configuration types for the server, supporting
//! both programmatic configuration and environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QUILL_SERVER_PORT` | 8080 | Server port |
//! | `QUILL_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `QUILL_LOG_LEVEL` | info | Log level |
//! | `QUILL_MAX_BODY_SIZE` | 10485760 | Max request body (bytes) |
//! | `QUILL_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `QUILL_ENABLE_CORS` | true | Enable CORS |
//! | `QUILL_CORS_ORIGINS` | * | Allowed origins |
//! | `QUILL_CORS_METHODS` | GET,POST,PUT,DELETE,OPTIONS | Allowed methods |
//! | `QUILL_CORS_HEADERS` | Content-Type,Accept,If-None-Match,If-Modified-Since | Allowed headers |
//! | `QUILL_BASE_URL` | http://localhost:8080 | Server base URL |
//! | `QUILL_STORAGE_BACKEND` | sqlite | Storage backend (sqlite, memory) |
//! | `QUILL_DATABASE_URL` | quill.db | SQLite file path, or `:memory:` |
//!
//! # Example
//!
//! ```rust
//! use quill_rest::ServerConfig;
//!
//! // Create from environment
//! let config = ServerConfig::from_env();
//!
//! // Or create programmatically
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     enable_cors: true,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;

use clap::{Parser, ValueEnum};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StorageBackendMode {
    /// SQLite, file-backed or in-memory depending on the database URL.
    #[default]
    Sqlite,
    /// Process-local maps, lost on exit.
    Memory,
}

impl fmt::Display for StorageBackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackendMode::Sqlite => write!(f, "sqlite"),
            StorageBackendMode::Memory => write!(f, "memory"),
        }
    }
}

/// Server configuration for the Quill HTTP interface.
///
/// This struct can be constructed from environment variables using [`ServerConfig::from_env`],
/// from command line arguments using [`ServerConfig::parse`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "quill")]
#[command(about = "Versioned clinical resource store")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "QUILL_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "QUILL_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "QUILL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "QUILL_MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "QUILL_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "QUILL_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "QUILL_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "QUILL_CORS_METHODS",
        default_value = "GET,POST,PUT,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "QUILL_CORS_HEADERS",
        default_value = "Content-Type,Accept,If-None-Match,If-Modified-Since"
    )]
    pub cors_headers: String,

    /// Base URL for the server (used in Location headers and Bundle links).
    #[arg(long, env = "QUILL_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Storage backend to use.
    #[arg(long, env = "QUILL_STORAGE_BACKEND", value_enum, default_value_t = StorageBackendMode::Sqlite)]
    pub storage_backend: StorageBackendMode,

    /// SQLite database path, or `:memory:`.
    #[arg(long, env = "QUILL_DATABASE_URL")]
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Accept,If-None-Match,If-Modified-Since".to_string(),
            base_url: "http://localhost:8080".to_string(),
            storage_backend: StorageBackendMode::Sqlite,
            database_url: None,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    ///
    /// This is a convenience method that parses environment variables without
    /// requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Returns the SQLite database path, defaulting to `quill.db`.
    pub fn database_path(&self) -> &str {
        self.database_url.as_deref().unwrap_or("quill.db")
    }

    /// Returns true when SQLite should run without a file.
    pub fn is_in_memory_database(&self) -> bool {
        self.database_path() == ":memory:"
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            errors.push(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            ));
        }

        if self.storage_backend == StorageBackendMode::Memory && self.database_url.is_some() {
            errors.push("Database URL is only used by the sqlite backend".to_string());
        }

        if matches!(self.database_url.as_deref(), Some(path) if path.trim().is_empty()) {
            errors.push("Database URL cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// This uses ephemeral port 0, an in-memory database and disables CORS.
    pub fn for_testing() -> Self {
        Self {
            port: 0, // Let OS assign port
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            max_body_size: 10 * 1024 * 1024,
            request_timeout: 5, // Shorter timeout for tests
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            base_url: "http://localhost:8080".to_string(),
            storage_backend: StorageBackendMode::Sqlite,
            database_url: Some(":memory:".to_string()),
        }
    }
}
