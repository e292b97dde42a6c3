//! Integration tests for file management and the dashboard
//!
//! Each mutating dashboard operation must be followed by a full re-fetch,
//! and every failure must surface as a classified error.

mod common;

use chrono::{Duration, Utc};
use common::{client, file_json, user_json, FakeBalancer};
use std::sync::Arc;
use vaultkrate::api::{ErrorCategory, MemorySink, Method, RequestBody};
use vaultkrate::auth::User;
use vaultkrate::files::{Dashboard, DeleteAtChange, FileManager, FileUpdate};
use vaultkrate::VaultKrateError;

fn setup() -> (Arc<FakeBalancer>, Arc<MemorySink>, FileManager) {
    let balancer = FakeBalancer::new();
    let sink = Arc::new(MemorySink::new());
    let manager = FileManager::new(client(&balancer, &sink));
    (balancer, sink, manager)
}

#[tokio::test]
async fn test_dashboard_refresh_loads_files_and_usage() {
    let (balancer, _sink, manager) = setup();
    balancer.json(
        Method::Get,
        "/files/info",
        200,
        serde_json::json!([file_json("f-1", Some("u-1")), file_json("f-2", Some("u-1"))]),
    );
    balancer.json(Method::Get, "/users/info", 200, user_json("u-1"));

    let dashboard = Dashboard::new(manager, User::new("u-1", None));
    let state = dashboard.refresh().await;

    assert!(state.is_complete());
    assert_eq!(state.files.len(), 2);
    assert_eq!(state.files[1].file_id, "f-2");
    let usage = state.usage.unwrap();
    assert_eq!(usage.space_used, 2048);

    let list = &balancer.requests_to(Method::Get, "/files/info")[0];
    assert_eq!(list.url, "https://balancer.test/files/info?user_id=u-1");
}

#[tokio::test]
async fn test_dashboard_keeps_partial_results() {
    let (balancer, _sink, manager) = setup();
    balancer.json(
        Method::Get,
        "/files/info",
        200,
        serde_json::json!([file_json("f-1", Some("u-1"))]),
    );
    balancer.status(Method::Get, "/users/info", 500);

    let dashboard = Dashboard::new(manager, User::new("u-1", None));
    let state = dashboard.refresh().await;

    assert!(!state.is_complete());
    assert_eq!(state.files.len(), 1);
    assert!(state.usage.is_none());
    assert_eq!(state.errors[0].category(), Some(ErrorCategory::Server));
}

#[tokio::test]
async fn test_update_clamps_delete_at_and_refetches() {
    let (balancer, _sink, manager) = setup();
    // Current record, then the refresh after the update
    balancer.json(Method::Get, "/files/info", 200, file_json("f-1", Some("u-1")));
    balancer.status(Method::Put, "/files/info", 200);
    balancer.json(
        Method::Get,
        "/files/info",
        200,
        serde_json::json!([file_json("f-1", Some("u-1"))]),
    );
    balancer.json(Method::Get, "/users/info", 200, user_json("u-1"));

    let dashboard = Dashboard::new(manager, User::new("u-1", None));
    let update = FileUpdate {
        file_name: Some("renamed".to_string()),
        description: None,
        delete_at: DeleteAtChange::Set(Utc::now() + Duration::minutes(30)),
    };

    let before = Utc::now();
    let (adjustment, state) = dashboard.update("f-1", &update).await.unwrap();
    let adjustment = adjustment.expect("delete_at was changed");

    assert!(adjustment.warning);
    let lead = adjustment.value - before;
    assert!(lead >= Duration::hours(3));
    assert!(lead < Duration::hours(3) + Duration::seconds(5));
    assert!(state.is_complete());

    let puts = balancer.requests_to(Method::Put, "/files/info");
    assert_eq!(puts.len(), 1);
    match &puts[0].body {
        RequestBody::Json(body) => {
            assert_eq!(body["file_id"], "f-1");
            assert_eq!(body["file_name"], "renamed");
            assert_eq!(body["description"], "quarterly report");
            assert_eq!(body["download_count"], 2);
            assert!(body["delete_at"].is_string());
        }
        other => panic!("expected JSON body, got {:?}", other),
    }
    assert_eq!(balancer.requests_to(Method::Get, "/files/info").len(), 2);
}

#[tokio::test]
async fn test_delete_refetches_list() {
    let (balancer, _sink, manager) = setup();
    balancer.status(Method::Delete, "/files/delete", 200);
    balancer.json(Method::Get, "/files/info", 200, serde_json::json!([]));
    balancer.json(Method::Get, "/users/info", 200, user_json("u-1"));

    let dashboard = Dashboard::new(manager, User::new("u-1", None));
    let state = dashboard.delete("f-1").await.unwrap();

    assert!(state.files.is_empty());
    let deletes = balancer.requests_to(Method::Delete, "/files/delete");
    assert_eq!(deletes[0].url, "https://balancer.test/files/delete?file_id=f-1");
}

#[tokio::test]
async fn test_failed_delete_skips_refresh() {
    let (balancer, sink, manager) = setup();
    balancer.status(Method::Delete, "/files/delete", 403);

    let dashboard = Dashboard::new(manager, User::new("u-1", None));
    let err = dashboard.delete("f-1").await.unwrap_err();

    assert_eq!(err.category(), Some(ErrorCategory::Permission));
    assert!(balancer.requests_to(Method::Get, "/files/info").is_empty());
    assert!(!sink.events_for("Delete File").is_empty());
}

#[tokio::test]
async fn test_file_context_classification() {
    let (balancer, _sink, manager) = setup();
    balancer.status(Method::Get, "/files/info", 404);
    balancer.status(Method::Get, "/files/download", 410);
    balancer.status(Method::Get, "/files/download", 403);

    match manager.file_info("missing").await.unwrap_err() {
        VaultKrateError::Api { category, message } => {
            assert_eq!(category, ErrorCategory::NotFound);
            assert_eq!(message, "File not found or it has expired.");
        }
        other => panic!("unexpected error: {other}"),
    }

    let expired = manager.download_file("old").await.unwrap_err();
    assert_eq!(expired.category(), Some(ErrorCategory::Expired));

    let forbidden = manager.download_file("private").await.unwrap_err();
    assert_eq!(forbidden.category(), Some(ErrorCategory::Forbidden));
    assert!(forbidden.category().unwrap().is_gone());
}

#[tokio::test]
async fn test_backend_failure_names_the_server() {
    let (balancer, sink, manager) = setup();
    balancer.json(
        Method::Get,
        "/files/download",
        502,
        serde_json::json!({
            "message": "Replica offline",
            "failed_server": {
                "server_identifier": "storage-eu-2",
                "server_url": "https://eu2.test",
                "provider": "aws"
            }
        }),
    );

    let err = manager.download_file("f-1").await.unwrap_err();

    assert_eq!(err.category(), Some(ErrorCategory::BackendFailure));
    assert!(err.to_string().contains("storage-eu-2"));
    let event = sink
        .events_for("Download File")
        .into_iter()
        .find(|e| e.fields.contains_key("failed_server"))
        .expect("failure reported");
    assert_eq!(event.fields["failed_server"]["server_url"], "https://eu2.test");
    assert_eq!(event.fields["file_id"], "f-1");
}

#[tokio::test]
async fn test_download_returns_bytes() {
    let (balancer, _sink, manager) = setup();
    balancer.reply(
        Method::Get,
        "/files/download",
        Ok(vaultkrate::api::ApiResponse::new(200, b"file body".to_vec())),
    );

    let bytes = manager.download_file("f-1").await.unwrap();
    assert_eq!(bytes, b"file body");
}
