// tests/integration/api_test.rs

//! Integration tests for the HTTP endpoints
//! Tests: POST /add, POST /check, GET /bloom-filter, GET /bloom-filter/info

use super::test_helpers::TestServer;
use bloomguard::server::api::{AddResponse, CheckResponse};
use serde_json::json;

// ===== POST /add =====

#[tokio::test]
async fn test_add_returns_created() {
    let server = TestServer::new().await;
    let (status, body) = server.add("password123").await;
    assert_eq!(status, 201);

    let response: AddResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(response.message, "Password added to Bloom Filter");
    assert!(response.newly_added);
    assert!(response.warning.is_none());
    assert!(body.get("warning").is_none());
}

#[tokio::test]
async fn test_add_twice_reports_not_newly_added() {
    let server = TestServer::new().await;
    server.add("qwerty").await;
    let (status, body) = server.add("qwerty").await;
    assert_eq!(status, 201);
    assert_eq!(body["newlyAdded"], json!(false));
}

#[tokio::test]
async fn test_add_rejects_empty_password() {
    let server = TestServer::new().await;
    let (status, body) = server.add("").await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("password"));
    assert_eq!(server.state.info().await.bits_set, 0);
}

#[tokio::test]
async fn test_add_rejects_missing_field() {
    let server = TestServer::new().await;
    let (status, body) = server.post_json("/add", &json!({"pass": "x"})).await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_add_rejects_non_string_password() {
    let server = TestServer::new().await;
    let (status, _) = server.post_json("/add", &json!({"password": 42})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_add_rejects_malformed_json() {
    let server = TestServer::new().await;
    let response = server
        .client
        .post(server.url("/add"))
        .header("content-type", "application/json")
        .body("{\"password\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_add_reports_stale_snapshot_as_warning() {
    let server = TestServer::new().await;
    // Occupy the snapshot path with a non-empty directory so the rename fails.
    std::fs::create_dir(&server.snapshot_path).unwrap();
    std::fs::write(server.snapshot_path.join("occupant"), b"x").unwrap();

    let (status, body) = server.add("baseball").await;
    assert_eq!(status, 201);
    let response: AddResponse = serde_json::from_value(body).unwrap();
    assert!(response.newly_added);
    assert!(response.warning.is_some());

    // The add is still visible to checks.
    let (_, body) = server.check("baseball").await;
    assert_eq!(body["possiblyPresent"], json!(true));

    let (_, info) = server.get_json("/bloom-filter/info").await;
    assert_eq!(info["snapshotStale"], json!(true));
}

// ===== POST /check =====

#[tokio::test]
async fn test_check_end_to_end() {
    let server = TestServer::new().await;
    server.add("password123").await;

    let (status, body) = server.check("password123").await;
    assert_eq!(status, 200);
    let present: CheckResponse = serde_json::from_value(body).unwrap();
    assert!(present.possibly_present);
    assert_eq!(
        present.message,
        "Password is probably present in common password list"
    );

    let (status, body) = server.check("a-never-added-string").await;
    assert_eq!(status, 200);
    let absent: CheckResponse = serde_json::from_value(body).unwrap();
    assert!(!absent.possibly_present);
    assert_eq!(absent.message, "Password is not present in common password list");
}

#[tokio::test]
async fn test_check_on_empty_filter_is_absent() {
    let server = TestServer::new().await;
    let (status, body) = server.check("anything").await;
    assert_eq!(status, 200);
    assert_eq!(body["possiblyPresent"], json!(false));
}

#[tokio::test]
async fn test_check_does_not_mutate() {
    let server = TestServer::new().await;
    server.check("dragon").await;
    assert_eq!(server.state.info().await.bits_set, 0);
    assert!(!server.snapshot_path.exists());
}

#[tokio::test]
async fn test_check_rejects_empty_password() {
    let server = TestServer::new().await;
    let (status, body) = server.check("").await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());
}

// ===== GET /bloom-filter =====

#[tokio::test]
async fn test_get_structure() {
    let server = TestServer::new().await;
    let (status, body) = server.get_json("/bloom-filter").await;
    assert_eq!(status, 200);
    assert_eq!(body["bitArraySize"], json!(624));
    assert_eq!(body["hashFunctionCount"], json!(5));
    let bits = body["bitArray"].as_array().unwrap();
    assert_eq!(bits.len(), 624);
    assert!(bits.iter().all(|b| *b == json!(0)));

    server.add("letmein").await;
    let (_, body) = server.get_json("/bloom-filter").await;
    let ones = body["bitArray"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|b| **b == json!(1))
        .count();
    assert!((1..=5).contains(&ones));
}

#[tokio::test]
async fn test_structure_matches_snapshot_on_disk() {
    let server = TestServer::new().await;
    server.add("monkey").await;
    server.add("shadow").await;

    let (_, body) = server.get_json("/bloom-filter").await;
    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&server.snapshot_path).unwrap()).unwrap();
    assert_eq!(body, on_disk);
}

// ===== GET /bloom-filter/info =====

#[tokio::test]
async fn test_info() {
    let server = TestServer::new().await;
    server.add("sunshine").await;

    let (status, info) = server.get_json("/bloom-filter/info").await;
    assert_eq!(status, 200);
    assert_eq!(info["size"], json!(624));
    assert_eq!(info["hashCount"], json!(5));
    assert_eq!(info["expectedElements"], json!(100));
    assert_eq!(info["targetFalsePositiveProbability"], json!(0.05));
    assert_eq!(info["snapshotStale"], json!(false));
    let bits_set = info["bitsSet"].as_u64().unwrap();
    assert!((1..=5).contains(&bits_set));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = TestServer::new().await;
    let response = server
        .client
        .get(server.url("/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
