//! REST API conformance tests.
//!
//! Tests the versioned resource behaviors over HTTP:
//! - Status codes for every lifecycle transition (200, 201, 204, 400, 404, 410, 415)
//! - Response headers (ETag, Last-Modified, Location, Content-Type)
//! - Conditional reads (If-None-Match, If-Modified-Since)
//! - Version reads and instance history

mod common;

use axum::http::{HeaderValue, StatusCode};
use common::*;
use serde_json::{Value, json};

// =============================================================================
// Create / Read
// =============================================================================

mod crud {
    use super::*;

    #[tokio::test]
    async fn test_create_returns_201_with_headers() {
        let server = sqlite_server();

        let response = server
            .post("/Patient")
            .add_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/fhir+json"),
            )
            .json(&json!({
                "resourceType": "Patient",
                "id": "client-chosen",
                "name": [{"family": "Duck"}]
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(header(&response, "etag"), "W/\"1\"");
        assert!(header(&response, "last-modified").ends_with("GMT"));

        let body: Value = response.json();
        let id = body["id"].as_str().unwrap();
        assert_ne!(id, "client-chosen", "server assigns the id on create");
        assert_eq!(body["meta"]["versionId"], "1");
        assert_eq!(body["resourceType"], "Patient");

        let location = header(&response, "location");
        assert_eq!(
            location,
            format!("http://localhost:8080/Patient/{id}/_history/1")
        );
    }

    #[tokio::test]
    async fn test_read_returns_current_version() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        let response = server.get(&format!("/Patient/{id}")).await;

        response.assert_status_ok();
        assert_eq!(header(&response, "etag"), "W/\"1\"");
        assert!(header(&response, "content-type").contains("application/fhir+json"));
        let body: Value = response.json();
        assert_eq!(body["id"], id.as_str());
        assert_eq!(body["name"][0]["family"], "Smith");
    }

    #[tokio::test]
    async fn test_read_unknown_returns_404() {
        let server = sqlite_server();

        let response = server.get("/Patient/does-not-exist").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["resourceType"], "OperationOutcome");
        assert_eq!(body["issue"][0]["code"], "not-found");
    }

    #[tokio::test]
    async fn test_read_under_other_type_returns_404() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        let response = server.get(&format!("/Observation/{id}")).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_with_other_resource_type_returns_400() {
        let server = sqlite_server();

        let response = server
            .post("/Patient")
            .json(&json!({"resourceType": "Observation", "status": "final"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["issue"][0]["code"], "value");
    }

    #[tokio::test]
    async fn test_non_json_body_returns_415() {
        let server = sqlite_server();

        let response = server
            .post("/Patient")
            .content_type("application/fhir+xml")
            .bytes("<Patient xmlns=\"http://hl7.org/fhir\"/>".into())
            .await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body: Value = response.json();
        assert_eq!(body["issue"][0]["code"], "not-supported");
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let server = sqlite_server();

        let response = server
            .post("/Patient")
            .content_type("application/json")
            .bytes("{not json".into())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_memory_backend_serves_the_same_interactions() {
        let server = memory_server();
        let id = create_patient(&server, "Smith").await;

        server.get(&format!("/Patient/{id}")).await.assert_status_ok();
        put_patient(&server, &id, "Jones").await.assert_status_ok();
        server
            .delete(&format!("/Patient/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/Patient/{id}"))
            .await
            .assert_status(StatusCode::GONE);
    }
}

// =============================================================================
// Update
// =============================================================================

mod update {
    use super::*;

    #[tokio::test]
    async fn test_update_existing_returns_200() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        let response = put_patient(&server, &id, "Jones").await;

        response.assert_status_ok();
        assert_eq!(header(&response, "etag"), "W/\"2\"");
        assert_eq!(
            header(&response, "location"),
            format!("http://localhost:8080/Patient/{id}/_history/2")
        );
        let body: Value = response.json();
        assert_eq!(body["meta"]["versionId"], "2");
        assert_eq!(body["name"][0]["family"], "Jones");
    }

    #[tokio::test]
    async fn test_update_ignores_read_preconditions() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        let first = server.get(&format!("/Patient/{id}")).await;
        let last_modified = header(&first, "last-modified");

        let response = server
            .put(&format!("/Patient/{id}"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_static("*"))
            .add_header(
                IF_MODIFIED_SINCE,
                HeaderValue::from_str(&last_modified).unwrap(),
            )
            .json(&patient(Some(&id), "Jones"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["meta"]["versionId"], "2");
        assert_eq!(body["name"][0]["family"], "Jones");
    }

    #[tokio::test]
    async fn test_update_unknown_upserts_with_201() {
        let server = sqlite_server();

        let response = put_patient(&server, "upsert-1", "New").await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(header(&response, "etag"), "W/\"1\"");

        server.get("/Patient/upsert-1").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_update_deleted_revives_with_201() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        server
            .delete(&format!("/Patient/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let response = put_patient(&server, &id, "Back").await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(header(&response, "etag"), "W/\"3\"");

        let read = server.get(&format!("/Patient/{id}")).await;
        read.assert_status_ok();
        let body: Value = read.json();
        assert_eq!(body["name"][0]["family"], "Back");
    }

    #[tokio::test]
    async fn test_update_without_id_returns_400() {
        let server = sqlite_server();

        let response = server
            .put("/Patient/p1")
            .json(&patient(None, "Smith"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["issue"][0]["code"], "required");
        assert_eq!(body["issue"][0]["expression"][0], "Patient.id");
    }

    #[tokio::test]
    async fn test_update_with_mismatched_id_returns_400() {
        let server = sqlite_server();

        let response = server
            .put("/Patient/p1")
            .json(&patient(Some("p2"), "Smith"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["issue"][0]["code"], "value");

        server
            .get("/Patient/p1")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_reports_every_issue() {
        let server = sqlite_server();

        let response = server
            .put("/Patient/p1")
            .json(&json!({"resourceType": "Observation"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["issue"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_id_owned_by_other_type_returns_409() {
        let server = sqlite_server();
        put_patient(&server, "shared", "Smith")
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .put("/Observation/shared")
            .json(&json!({"resourceType": "Observation", "id": "shared"}))
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }
}

// =============================================================================
// Delete
// =============================================================================

mod delete {
    use super::*;

    #[tokio::test]
    async fn test_delete_then_read_returns_410() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        let response = server.delete(&format!("/Patient/{id}")).await;
        response.assert_status(StatusCode::NO_CONTENT);

        let read = server.get(&format!("/Patient/{id}")).await;
        read.assert_status(StatusCode::GONE);
        let body: Value = read.json();
        assert_eq!(body["issue"][0]["code"], "deleted");
    }

    #[tokio::test]
    async fn test_delete_twice_returns_404_and_appends_nothing() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        server
            .delete(&format!("/Patient/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&format!("/Patient/{id}"))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let history: Value = server
            .get(&format!("/Patient/{id}/_history"))
            .await
            .json();
        assert_eq!(history["total"], 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_returns_404() {
        let server = sqlite_server();

        server
            .delete("/Patient/nobody")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Version Read
// =============================================================================

mod vread {
    use super::*;

    #[tokio::test]
    async fn test_vread_returns_each_version() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        put_patient(&server, &id, "Jones").await.assert_status_ok();

        let v1 = server.get(&format!("/Patient/{id}/_history/1")).await;
        v1.assert_status_ok();
        assert_eq!(header(&v1, "etag"), "W/\"1\"");
        let body: Value = v1.json();
        assert_eq!(body["name"][0]["family"], "Smith");

        let v2: Value = server
            .get(&format!("/Patient/{id}/_history/2"))
            .await
            .json();
        assert_eq!(v2["name"][0]["family"], "Jones");
        assert_eq!(v2["meta"]["versionId"], "2");
    }

    #[tokio::test]
    async fn test_vread_tombstone_returns_410() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        server.delete(&format!("/Patient/{id}")).await;

        server
            .get(&format!("/Patient/{id}/_history/2"))
            .await
            .assert_status(StatusCode::GONE);
        server
            .get(&format!("/Patient/{id}/_history/1"))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_vread_missing_version_returns_404() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        server
            .get(&format!("/Patient/{id}/_history/7"))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get(&format!("/Patient/{id}/_history/latest"))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// History
// =============================================================================

mod history {
    use super::*;

    #[tokio::test]
    async fn test_history_lists_newest_first() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        put_patient(&server, &id, "Jones").await.assert_status_ok();
        server.delete(&format!("/Patient/{id}")).await;
        put_patient(&server, &id, "Back")
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get(&format!("/Patient/{id}/_history")).await;
        response.assert_status_ok();

        let bundle: Value = response.json();
        assert_eq!(bundle["resourceType"], "Bundle");
        assert_eq!(bundle["type"], "history");
        assert_eq!(bundle["total"], 4);

        let entries = bundle["entry"].as_array().unwrap();
        let statuses: Vec<&str> = entries
            .iter()
            .map(|e| e["response"]["status"].as_str().unwrap())
            .collect();
        assert_eq!(
            statuses,
            vec!["201 Created", "204 No Content", "200 OK", "201 Created"]
        );
        assert_eq!(entries[0]["resource"]["meta"]["versionId"], "4");
        assert!(entries[1].get("resource").is_none());
        assert_eq!(entries[3]["request"]["method"], "POST");
    }

    #[tokio::test]
    async fn test_history_renders_upsert_as_initial_create() {
        let server = sqlite_server();
        put_patient(&server, "upsert-1", "New")
            .await
            .assert_status(StatusCode::CREATED);

        let bundle: Value = server.get("/Patient/upsert-1/_history").await.json();

        let entry = &bundle["entry"][0];
        assert_eq!(entry["request"]["method"], "POST");
        assert_eq!(entry["request"]["url"], "Patient");
        assert_eq!(entry["response"]["status"], "201 Created");
    }

    #[tokio::test]
    async fn test_history_unknown_returns_404() {
        let server = sqlite_server();

        server
            .get("/Patient/nobody/_history")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Conditional Read
// =============================================================================

mod conditional {
    use super::*;

    #[tokio::test]
    async fn test_if_none_match_current_returns_304() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        let first = server.get(&format!("/Patient/{id}")).await;
        let etag = header(&first, "etag");

        let response = server
            .get(&format!("/Patient/{id}"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_str(&etag).unwrap())
            .await;

        response.assert_status(StatusCode::NOT_MODIFIED);
        assert_eq!(header(&response, "etag"), etag);
        assert!(response.headers().get("last-modified").is_some());
        assert!(response.as_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_if_none_match_star_returns_304() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        server
            .get(&format!("/Patient/{id}"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_static("*"))
            .await
            .assert_status(StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_if_none_match_stale_returns_200() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        put_patient(&server, &id, "Jones").await.assert_status_ok();

        let response = server
            .get(&format!("/Patient/{id}"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_static("W/\"1\""))
            .await;

        response.assert_status_ok();
        assert_eq!(header(&response, "etag"), "W/\"2\"");
    }

    #[tokio::test]
    async fn test_vread_if_none_match_returns_304() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        put_patient(&server, &id, "Jones").await.assert_status_ok();

        let response = server
            .get(&format!("/Patient/{id}/_history/1"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_static("W/\"1\""))
            .await;
        response.assert_status(StatusCode::NOT_MODIFIED);
        assert_eq!(header(&response, "etag"), "W/\"1\"");
        assert!(response.as_bytes().is_empty());

        let stale = server
            .get(&format!("/Patient/{id}/_history/1"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_static("W/\"2\""))
            .await;
        stale.assert_status_ok();
        assert_eq!(header(&stale, "etag"), "W/\"1\"");
        let body: Value = stale.json();
        assert_eq!(body["name"][0]["family"], "Smith");
    }

    #[tokio::test]
    async fn test_vread_if_modified_since_returns_304() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        let v1 = server.get(&format!("/Patient/{id}/_history/1")).await;
        let last_modified = header(&v1, "last-modified");

        server
            .get(&format!("/Patient/{id}/_history/1"))
            .add_header(
                IF_MODIFIED_SINCE,
                HeaderValue::from_str(&last_modified).unwrap(),
            )
            .await
            .assert_status(StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_if_modified_since_current_returns_304() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        let first = server.get(&format!("/Patient/{id}")).await;
        let last_modified = header(&first, "last-modified");

        server
            .get(&format!("/Patient/{id}"))
            .add_header(
                IF_MODIFIED_SINCE,
                HeaderValue::from_str(&last_modified).unwrap(),
            )
            .await
            .assert_status(StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_if_modified_since_older_returns_200() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        server
            .get(&format!("/Patient/{id}"))
            .add_header(
                IF_MODIFIED_SINCE,
                HeaderValue::from_static("Mon, 01 Jan 2001 00:00:00 GMT"),
            )
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_if_none_match_takes_priority_over_date() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        let first = server.get(&format!("/Patient/{id}")).await;
        let last_modified = header(&first, "last-modified");

        // A stale tag wins over a date that alone would short-circuit.
        server
            .get(&format!("/Patient/{id}"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_static("W/\"99\""))
            .add_header(
                IF_MODIFIED_SINCE,
                HeaderValue::from_str(&last_modified).unwrap(),
            )
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_malformed_date_is_ignored() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;

        server
            .get(&format!("/Patient/{id}"))
            .add_header(IF_MODIFIED_SINCE, HeaderValue::from_static("yesterday"))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_conditional_read_of_deleted_returns_410() {
        let server = sqlite_server();
        let id = create_patient(&server, "Smith").await;
        server.delete(&format!("/Patient/{id}")).await;

        server
            .get(&format!("/Patient/{id}"))
            .add_header(IF_NONE_MATCH, HeaderValue::from_static("*"))
            .await
            .assert_status(StatusCode::GONE);
    }
}

// =============================================================================
// Health
// =============================================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_backend() {
        let server = sqlite_server();

        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], "sqlite");
    }
}
