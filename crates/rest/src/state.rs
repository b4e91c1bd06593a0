//! Application state for the Quill HTTP interface.
//!
//! This module defines the shared application state that is available to all
//! request handlers: the resource lifecycle over a version log, the
//! conditional-request protocol and the server configuration.

use std::sync::Arc;

use quill_persistence::conditional::ConditionalProtocol;
use quill_persistence::core::VersionLog;
use quill_persistence::lifecycle::ResourceLifecycle;

use crate::config::ServerConfig;

/// Shared application state for the HTTP interface.
///
/// # Type Parameters
///
/// * `L` - The version log backend (must implement [`VersionLog`])
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use quill_persistence::backends::MemoryBackend;
/// use quill_rest::{AppState, ServerConfig};
///
/// let state = AppState::new(Arc::new(MemoryBackend::new()), ServerConfig::default());
/// assert_eq!(state.base_url(), "http://localhost:8080");
/// ```
pub struct AppState<L> {
    /// The lifecycle over the version log.
    lifecycle: ResourceLifecycle<L>,

    /// Validator computation and precondition evaluation.
    protocol: ConditionalProtocol,

    /// Server configuration.
    config: Arc<ServerConfig>,
}

// Manually implement Clone since L is wrapped in Arc and doesn't need to be Clone
impl<L> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            protocol: self.protocol,
            config: Arc::clone(&self.config),
        }
    }
}

impl<L: VersionLog> AppState<L> {
    /// Creates a new AppState with the given log and configuration.
    pub fn new(log: Arc<L>, config: ServerConfig) -> Self {
        Self {
            lifecycle: ResourceLifecycle::new(log),
            protocol: ConditionalProtocol::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the resource lifecycle.
    pub fn lifecycle(&self) -> &ResourceLifecycle<L> {
        &self.lifecycle
    }

    /// Returns the version log backend.
    pub fn log(&self) -> &L {
        self.lifecycle.log()
    }

    /// Returns the conditional-request protocol.
    pub fn protocol(&self) -> &ConditionalProtocol {
        &self.protocol
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the base URL for the server, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_persistence::Backend;
    use quill_persistence::backends::MemoryBackend;

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new(Arc::new(MemoryBackend::new()), ServerConfig::default());

        assert_eq!(state.log().name(), "memory");
        assert_eq!(state.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_app_state_config_access() {
        let config = ServerConfig {
            base_url: "https://quill.example.com/".to_string(),
            request_timeout: 12,
            ..Default::default()
        };
        let state = AppState::new(Arc::new(MemoryBackend::new()), config);

        assert_eq!(state.base_url(), "https://quill.example.com");
        assert_eq!(state.config().request_timeout, 12);
    }

    #[tokio::test]
    async fn test_app_state_clone_shares_log() {
        let state = AppState::new(Arc::new(MemoryBackend::new()), ServerConfig::default());
        let cloned = state.clone();

        state
            .lifecycle()
            .create("Patient", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(cloned.log().resource_count(), 1);
    }
}
