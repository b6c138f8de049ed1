//! Integration tests for the invocation server
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`;
//! upstream pages come from a wiremock server.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use starwatch::config::load_config;
use starwatch::server::{router, AppState};
use starwatch::storage::Storage;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"
<html><body>
<div class="fiction-list">
  <div class="fiction-list-item row">
    <h2 class="fiction-title"><a href="/fiction/11/eleven">Eleven</a></h2>
  </div>
  <div class="fiction-list-item row">
    <h2 class="fiction-title"><a href="/fiction/12/twelve">Twelve</a></h2>
  </div>
</div>
</body></html>
"#;

/// Builds the app against `base_url` with a database in `dir`
fn create_app(base_url: &str, dir: &TempDir) -> (Router, AppState) {
    let db_path = dir.path().join("starwatch.db");
    let config_path = dir.path().join("starwatch.toml");
    let toml = format!(
        r#"
[site]
base-url = "{}"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[scraper]
request-delay-ms = 0
rate-limit-cooldown-ms = 0

[rising-stars]
genres = ["main", "fantasy"]

[storage]
database-path = "{}"
"#,
        base_url,
        db_path.display()
    );
    std::fs::write(&config_path, toml).expect("Failed to write config");

    let config = load_config(&config_path).expect("Failed to load config");
    let state =
        AppState::from_config(config, "test-hash".to_string()).expect("Failed to build state");
    (router(state.clone()), state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).expect("Body is not JSON");
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_app(&server.uri(), &dir);

    let (status, body) = send(app, empty("GET", "/healthz")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["executionTime"].is_u64());
}

#[tokio::test]
async fn test_invoke_without_mode_is_bad_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_app(&server.uri(), &dir);

    let (status, body) = send(app, post_json("/invoke", json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "mode is required");
}

#[tokio::test]
async fn test_invoke_with_malformed_body_is_bad_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_app(&server.uri(), &dir);

    let request = Request::builder()
        .method("POST")
        .uri("/invoke")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_gone_fiction_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fiction/77"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_app(&server.uri(), &dir);

    let (status, body) = send(app, empty("POST", "/fiction/77")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("77"));
}

#[tokio::test]
async fn test_invoke_fiction_id_alone_scrapes_fiction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fiction/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="fic-title"><h1>Five</h1></div></body></html>"#,
        ))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_app(&server.uri(), &dir);

    let (status, body) = send(app, post_json("/invoke", json!({ "fictionId": 5 }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 5);
    assert_eq!(body["data"]["title"], "Five");
    assert_eq!(state.store.lock().await.count_history_entries().unwrap(), 1);
}

#[tokio::test]
async fn test_rising_stars_reports_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fictions/rising-stars"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fictions/rising-stars/fantasy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, state) = create_app(&server.uri(), &dir);

    let (status, body) = send(app.clone(), empty("POST", "/rising-stars")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["processedCount"], 2);
    assert_eq!(body["totalCount"], 2);
    assert_eq!(body["remainingCount"], 0);
    assert_eq!(state.store.lock().await.count_snapshot_entries().unwrap(), 4);

    // Everything is fresh now; an empty run is still a success
    let (status, body) = send(
        app,
        post_json("/invoke", json!({ "mode": "rising-stars" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 0);
    assert_eq!(body["processedCount"], 0);
}

#[tokio::test]
async fn test_unknown_genre_is_bad_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_app(&server.uri(), &dir);

    let (status, body) = send(app.clone(), empty("GET", "/movement/western")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(app, empty("POST", "/rising-stars?genre=western")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_movement_view() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fictions/rising-stars/fantasy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let (app, _) = create_app(&server.uri(), &dir);

    let (status, _) = send(app.clone(), empty("POST", "/rising-stars?genre=fantasy")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, empty("GET", "/movement/fantasy?follow=12&size=1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    let movements = body["data"]["movements"].as_array().unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["fictionId"], 12);
    assert_eq!(movements[0]["isNew"], true);
}
