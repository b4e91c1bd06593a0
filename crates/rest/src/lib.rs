//! # quill-rest - HTTP interface for the Quill resource store
//!
//! This crate exposes the versioned resource store of `quill-persistence`
//! over HTTP: create, read, version read, update (including upsert and
//! revive), delete and instance history, with conditional reads driven by
//! weak ETags and Last-Modified.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quill_persistence::backends::sqlite::SqliteBackend;
//! use quill_rest::{ServerConfig, create_app_with_config};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("quill.db")?;
//! backend.init_schema()?;
//!
//! let config = ServerConfig::default();
//! let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//! axum::serve(listener, create_app_with_config(backend, config)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API Endpoints
//!
//! | Interaction | HTTP Method | URL Pattern |
//! |------------|-------------|-------------|
//! | read | GET | `/[type]/[id]` |
//! | vread | GET | `/[type]/[id]/_history/[vid]` |
//! | update | PUT | `/[type]/[id]` |
//! | delete | DELETE | `/[type]/[id]` |
//! | create | POST | `/[type]` |
//! | history (instance) | GET | `/[type]/[id]/_history` |
//! | health | GET | `/health` |
//!
//! ## HTTP Headers
//!
//! - `ETag` / `Last-Modified` - Sent with every representation
//! - `Location` - Sent on create and update, pointing at the written version
//! - `If-None-Match` - Conditional read; takes priority over `If-Modified-Since`
//! - `If-Modified-Since` - Conditional read by date, at whole-second precision
//!
//! ## Error Handling
//!
//! All errors are returned as OperationOutcome resources:
//!
//! | HTTP Status | Issue Code | Description |
//! |-------------|-----------------|-------------|
//! | 400 | required / value / structure / invalid | Body failed identity checks |
//! | 404 | not-found | Resource or version not found |
//! | 409 | conflict | Concurrent write or id collision |
//! | 410 | deleted | Resource or version was deleted |
//! | 415 | not-supported | Body is not JSON |
//! | 500 | exception | Internal server error |
//! | 503 | transient | Backend unavailable |
//!
//! ## Architecture
//!
//! - [`error`] - Error types and OperationOutcome generation
//! - [`config`] - Server configuration
//! - [`state`] - Application state (lifecycle, protocol, configuration)
//! - [`handlers`] - HTTP request handlers for each interaction
//! - [`middleware`] - Conditional request headers
//! - [`extractors`] - Request body extraction
//! - [`responses`] - Representations, bundles and headers
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::{ServerConfig, StorageBackendMode};
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use quill_persistence::core::VersionLog;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates the Axum application with default configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app<L>(log: L) -> Router
where
    L: VersionLog + 'static,
{
    create_app_with_config(log, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// # Example
///
/// ```rust
/// use quill_persistence::backends::MemoryBackend;
/// use quill_rest::{ServerConfig, create_app_with_config};
///
/// let config = ServerConfig {
///     enable_cors: false,
///     ..Default::default()
/// };
/// let app = create_app_with_config(MemoryBackend::new(), config);
/// ```
pub fn create_app_with_config<L>(log: L, config: ServerConfig) -> Router
where
    L: VersionLog + 'static,
{
    create_app_with_shared_log(Arc::new(log), config)
}

/// Creates the Axum application over a log that the caller also holds.
pub fn create_app_with_shared_log<L>(log: Arc<L>, config: ServerConfig) -> Router
where
    L: VersionLog + 'static,
{
    info!("Creating HTTP server with backend: {}", log.name());

    // Create application state
    let state = AppState::new(log, config.clone());

    // Build the router with all routes
    let router = routing::fhir_routes::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    let router = router.layer(DefaultBodyLimit::max(config.max_body_size));

    // Add CORS if enabled
    let router = if config.enable_cors {
        let cors = build_cors_layer(&config);
        router.layer(cors)
    } else {
        router
    };

    // Apply remaining middleware
    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    // Configure origins
    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    // Let browsers read the validators and the write location.
    cors.expose_headers([
        axum::http::header::ETAG,
        axum::http::header::LAST_MODIFIED,
        axum::http::header::LOCATION,
    ])
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "quill={level},quill_rest={level},quill_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
