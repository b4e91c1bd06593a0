//! Shared helpers for the REST integration tests.

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestResponse, TestServer};
use quill_persistence::backends::MemoryBackend;
use quill_persistence::backends::sqlite::SqliteBackend;
use quill_rest::{ServerConfig, create_app_with_config};
use serde_json::{Value, json};

pub const CONTENT_TYPE: HeaderName = HeaderName::from_static("content-type");
pub const IF_NONE_MATCH: HeaderName = HeaderName::from_static("if-none-match");
pub const IF_MODIFIED_SINCE: HeaderName = HeaderName::from_static("if-modified-since");

/// Creates a test server over an in-memory SQLite database.
pub fn sqlite_server() -> TestServer {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to init schema");

    let app = create_app_with_config(backend, ServerConfig::for_testing());
    TestServer::new(app).expect("Failed to create test server")
}

/// Creates a test server over the in-process backend.
pub fn memory_server() -> TestServer {
    let app = create_app_with_config(MemoryBackend::new(), ServerConfig::for_testing());
    TestServer::new(app).expect("Failed to create test server")
}

/// A minimal patient body, optionally carrying an id.
pub fn patient(id: Option<&str>, family: &str) -> Value {
    let mut body = json!({
        "resourceType": "Patient",
        "name": [{"family": family}]
    });
    if let Some(id) = id {
        body["id"] = json!(id);
    }
    body
}

/// POSTs a patient and returns the server-assigned id.
pub async fn create_patient(server: &TestServer, family: &str) -> String {
    let response = server
        .post("/Patient")
        .add_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/fhir+json"),
        )
        .json(&patient(None, family))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    body["id"]
        .as_str()
        .expect("created resource should carry an id")
        .to_string()
}

/// PUTs a patient under `id`.
pub async fn put_patient(server: &TestServer, id: &str, family: &str) -> TestResponse {
    server
        .put(&format!("/Patient/{id}"))
        .json(&patient(Some(id), family))
        .await
}

/// Reads a header as a string, panicking when it is missing.
pub fn header(response: &TestResponse, name: &str) -> String {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("response should carry {name}"))
        .to_str()
        .expect("header should be ASCII")
        .to_string()
}
