//! Tests for Firestore client functionality.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{FirestoreClient, FirestoreConfig};
use crate::error::FirestoreError;
use crate::retry::RetryConfig;
use crate::types::{Direction, Fields, Precondition, StructuredQuery, ToFirestoreValue};

// =============================================================================
// Test Helpers
// =============================================================================

const DOCS: &str = "/v1/projects/test-project/databases/(default)/documents";

fn test_config(emulator_host: Option<String>) -> FirestoreConfig {
    FirestoreConfig {
        project_id: "test-project".to_string(),
        database_id: "(default)".to_string(),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        },
        emulator_host,
        listen_resync: None,
    }
}

async fn client_for(server: &MockServer) -> FirestoreClient {
    FirestoreClient::new(test_config(Some(server.address().to_string())))
        .await
        .unwrap()
}

fn stream_doc(id: &str) -> serde_json::Value {
    json!({
        "name": format!("projects/test-project/databases/(default)/documents/streams/{id}"),
        "fields": {
            "videoId": {"stringValue": "dQw4w9WgXcQ"},
            "title": {"stringValue": "Day one"},
            "isActive": {"booleanValue": true}
        },
        "createTime": "2024-05-01T10:00:00Z",
        "updateTime": "2024-05-01T10:00:00Z"
    })
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_from_http_status() {
    assert!(matches!(
        FirestoreError::from_http_status(429, "rate limited"),
        FirestoreError::RateLimited(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(503, "unavailable"),
        FirestoreError::ServerError(503, _)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(400, "bad request"),
        FirestoreError::RequestFailed(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(404, "not found"),
        FirestoreError::NotFound(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(409, "conflict"),
        FirestoreError::AlreadyExists(_)
    ));
}

#[test]
fn test_error_retryability() {
    for status in [429, 500, 502, 503] {
        assert!(FirestoreError::from_http_status(status, "").is_retryable(), "{status}");
    }
    for status in [400, 401, 403, 404, 409, 412] {
        assert!(!FirestoreError::from_http_status(status, "").is_retryable(), "{status}");
    }
}

#[test]
fn test_error_http_status_getter() {
    assert_eq!(FirestoreError::RateLimited(1000).http_status(), Some(429));
    assert_eq!(
        FirestoreError::ServerError(502, "bad gateway".into()).http_status(),
        Some(502)
    );
    assert_eq!(FirestoreError::unavailable("offline").http_status(), Some(503));
    assert_eq!(FirestoreError::RateLimited(5000).retry_after_ms(), Some(5000));
    assert_eq!(FirestoreError::not_found("x").retry_after_ms(), None);
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_validates_empty_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    assert!(FirestoreConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_config_accepts_firebase_project_id() {
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "firebase-project");
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "gcp-project");
}

#[test]
#[serial]
fn test_config_handles_invalid_env_values() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
}

#[test]
#[serial]
fn test_config_resync_zero_disables() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("FIRESTORE_LISTEN_RESYNC_SECS", "0");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.listen_resync, None);
    std::env::remove_var("FIRESTORE_LISTEN_RESYNC_SECS");
}

#[test]
#[serial]
fn test_config_emulator_host() {
    std::env::set_var("GCP_PROJECT_ID", "demo");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");
    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(
        config.documents_url(),
        "http://localhost:8080/v1/projects/demo/databases/(default)/documents"
    );
    std::env::remove_var("FIRESTORE_EMULATOR_HOST");
}

// =============================================================================
// REST Round Trips
// =============================================================================

#[tokio::test]
async fn test_create_without_id_posts_to_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/streams")))
        .and(body_partial_json(json!({"fields": {"title": {"stringValue": "Day one"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(stream_doc("auto123")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut fields = Fields::new();
    fields.insert("title".into(), "Day one".to_firestore_value());

    let doc = client.create_document("streams", None, fields).await.unwrap();
    assert_eq!(doc.id(), Some("auto123"));
}

#[tokio::test]
async fn test_update_sends_mask_and_exists_precondition() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/streams/abc")))
        .and(query_param("updateMask.fieldPaths", "title"))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stream_doc("abc")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut fields = Fields::new();
    fields.insert("title".into(), "Renamed".to_firestore_value());

    client
        .update_document(
            "streams",
            "abc",
            fields,
            Some(vec!["title".into()]),
            Some(Precondition::must_exist()),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_missing_document_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/streams/gone")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "No document to update", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .update_document("streams", "gone", Fields::new(), None, Some(Precondition::must_exist()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_missing_document_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{DOCS}/streams/gone")))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .delete_document("streams", "gone", Some(Precondition::must_exist()))
        .await
        .unwrap_err();
    assert!(matches!(err, FirestoreError::NotFound(_)));
}

#[tokio::test]
async fn test_get_missing_document_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/streams/nope")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.get_document("streams", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_query_on_root_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{"collectionId": "streams"}],
                "orderBy": [{"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"}]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": stream_doc("b"), "readTime": "2024-05-01T10:00:01Z"},
            {"document": stream_doc("a"), "readTime": "2024-05-01T10:00:01Z"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let query = StructuredQuery::collection("streams").order_by("createdAt", Direction::Descending);
    let docs = client.run_query("", query).await.unwrap();

    let ids: Vec<_> = docs.iter().filter_map(|d| d.id()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn test_run_query_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"readTime": "2024-05-01T10:00:01Z"}])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let docs = client
        .run_query("", StructuredQuery::collection("streams"))
        .await
        .unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_server_error_is_retried_through_with_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/streams/flaky")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/streams/flaky")))
        .respond_with(ResponseTemplate::new(200).set_body_json(stream_doc("flaky")))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let doc = client
        .with_retry("get_document", || client.get_document("streams", "flaky"))
        .await
        .unwrap();
    assert!(doc.is_some());
}
