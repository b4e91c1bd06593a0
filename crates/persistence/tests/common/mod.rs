//! Shared fixtures for persistence integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};

use quill_persistence::backends::MemoryBackend;
use quill_persistence::backends::sqlite::SqliteBackend;
use quill_persistence::lifecycle::ResourceLifecycle;

pub fn sqlite_backend() -> Arc<SqliteBackend> {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    Arc::new(backend)
}

pub fn memory_backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new())
}

pub fn sqlite_lifecycle() -> ResourceLifecycle<SqliteBackend> {
    ResourceLifecycle::new(sqlite_backend())
}

pub fn memory_lifecycle() -> ResourceLifecycle<MemoryBackend> {
    ResourceLifecycle::new(memory_backend())
}

pub fn patient(family: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "name": [{"family": family, "given": ["Alex"]}],
        "active": true
    })
}

pub fn family(content: &Value) -> &str {
    content["name"][0]["family"].as_str().unwrap_or_default()
}
