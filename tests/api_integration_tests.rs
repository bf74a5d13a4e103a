//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tiered_kv::{create_router, AppState, Store};
use tower::ServiceExt;

// == Helper Functions ==

async fn create_test_app() -> Router {
    let store = Store::builder().build().await;
    create_router(AppState::new(store))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sends one request, with a JSON body when `body` is given.
async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"test_key","value":"test_value"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_endpoint_with_ttl() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"ttl_key","value":"ttl_value","ttl":60}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/ttl/ttl_key", None).await;
    assert_eq!(status, StatusCode::OK);
    let ttl = json["ttl"].as_i64().unwrap();
    assert!((1..=60).contains(&ttl));
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app().await;
    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"user:1","value":"alice"}"#),
    )
    .await;

    let (status, json) = send(&app, "GET", "/get/user:1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "user:1");
    assert_eq!(json["value"], "alice");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "GET", "/get/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_get_endpoint_invalid_key() {
    let app = create_test_app().await;

    let (status, _) = send(&app, "GET", "/get/bad%20key", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(r#"{"key":"gone","value":"soon"}"#)).await;

    let (status, _) = send(&app, "DELETE", "/del/gone", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/get/gone", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let app = create_test_app().await;

    let (status, _) = send(&app, "DELETE", "/del/never_set", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == KEYS Endpoint Tests ==

#[tokio::test]
async fn test_keys_endpoint_lists_sorted_keys() {
    let app = create_test_app().await;
    for key in ["b", "a", "c"] {
        let body = format!(r#"{{"key":"{key}","value":"v"}}"#);
        send(&app, "PUT", "/set", Some(&body)).await;
    }

    let (status, json) = send(&app, "GET", "/keys", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["keys"], serde_json::json!(["a", "b", "c"]));
}

#[tokio::test]
async fn test_keys_endpoint_time_range() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(r#"{"key":"recent","value":"v"}"#)).await;

    let (_, json) = send(
        &app,
        "GET",
        "/keys?from=2000-01-01T00:00:00Z&to=2999-01-01T00:00:00Z",
        None,
    )
    .await;
    assert_eq!(json["keys"], serde_json::json!(["recent"]));

    let (_, json) = send(
        &app,
        "GET",
        "/keys?from=2000-01-01T00:00:00Z&to=2000-01-02T00:00:00Z",
        None,
    )
    .await;
    assert_eq!(json["count"], 0);
}

// == TTL and TOUCH Endpoint Tests ==

#[tokio::test]
async fn test_ttl_endpoint_sentinels() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(r#"{"key":"forever","value":"v"}"#)).await;

    let (_, json) = send(&app, "GET", "/ttl/forever", None).await;
    assert_eq!(json["ttl"], -1);

    let (_, json) = send(&app, "GET", "/ttl/missing", None).await;
    assert_eq!(json["ttl"], -2);
}

#[tokio::test]
async fn test_touch_endpoint() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(r#"{"key":"t","value":"v"}"#)).await;

    let (status, _) = send(&app, "POST", "/touch/t", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/touch/absent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == COUNTER Endpoint Tests ==

#[tokio::test]
async fn test_counter_endpoint_increments() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "POST", "/counter", Some(r#"{"key":"hits","delta":5}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], 5);

    let (_, json) = send(&app, "POST", "/counter", Some(r#"{"key":"hits","delta":-2}"#)).await;
    assert_eq!(json["value"], 3);

    let (_, json) = send(&app, "GET", "/get/hits", None).await;
    assert_eq!(json["value"], "3");
}

#[tokio::test]
async fn test_counter_endpoint_limit_conflict() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        "PUT",
        "/limits",
        Some(r#"{"key":"seats","min":0,"max":2}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "POST", "/counter", Some(r#"{"key":"seats","delta":3}"#)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("maximum"));
}

#[tokio::test]
async fn test_limits_endpoint_rejects_plain_value() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(r#"{"key":"name","value":"ada"}"#)).await;

    let (status, _) = send(
        &app,
        "PUT",
        "/limits",
        Some(r#"{"key":"name","min":0,"max":10}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_counter_endpoint_non_numeric_value() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(r#"{"key":"word","value":"abc"}"#)).await;

    let (status, _) = send(&app, "POST", "/counter", Some(r#"{"key":"word","delta":1}"#)).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(r#"{"key":"k","value":"v"}"#)).await;

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["keys"], 1);
    assert!(json.get("timestamp").is_some());
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/set")
                .header("content-type", "application/json")
                .body(Body::from("not valid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "PUT", "/set", Some(r#"{"key":"","value":"v"}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}

// == TTL Expiration via API Tests ==

#[tokio::test]
async fn test_zero_ttl_expires_immediately() {
    let app = create_test_app().await;

    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"flash","value":"v","ttl":0}"#),
    )
    .await;

    let (status, _) = send(&app, "GET", "/get/flash", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
