//! Integration tests for web routes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use mastofeed::config::Config;
use mastofeed::db::{upsert_posts, Database, NewPost};
use mastofeed::web::{create_app, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn test_app(db: Database, config: Config) -> axum::Router {
    create_app(AppState {
        db,
        config: Arc::new(config),
    })
}

fn make_post(id: &str, created_at: &str) -> NewPost {
    NewPost {
        id: id.to_string(),
        created_at: created_at.to_string(),
        edited_at: None,
        url: format!("https://mastodon.example/@alice/{id}"),
        content: format!("<p>post {id}</p>"),
        spoiler_text: String::new(),
        account_id: "1".to_string(),
        account_username: "alice".to_string(),
        account_display_name: "Alice".to_string(),
        account_url: "https://mastodon.example/@alice".to_string(),
        raw: serde_json::json!({"id": id}),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not valid JSON")
}

#[tokio::test]
async fn test_healthz() {
    let (db, _temp_dir) = setup_db().await;
    let app = test_app(db, Config::for_testing());

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_index() {
    let (db, _temp_dir) = setup_db().await;
    let app = test_app(db, Config::for_testing());

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_feed_json_empty_store() {
    let (db, _temp_dir) = setup_db().await;
    let app = test_app(db, Config::for_testing());

    let response = app
        .oneshot(Request::get("/feed.json").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/feed+json")
    );

    let json = body_json(response).await;
    assert_eq!(json["version"], "https://jsonfeed.org/version/1.1");
    assert_eq!(json["title"], "Mastodon timeline");
    assert_eq!(json["items"], serde_json::json!([]));
}

#[tokio::test]
async fn test_feed_json_returns_recent_posts_newest_first() {
    let (db, _temp_dir) = setup_db().await;

    let posts = vec![
        make_post("1", "2024-01-01T00:00:00.000Z"),
        make_post("2", "2024-01-02T00:00:00.000Z"),
    ];
    upsert_posts(db.pool(), &posts)
        .await
        .expect("Failed to seed posts");

    let app = test_app(db, Config::for_testing());
    let response = app
        .oneshot(Request::get("/feed.json").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let items = json["items"].as_array().expect("items missing");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "2");
    assert_eq!(items[1]["id"], "1");
    assert_eq!(items[0]["title"], "Alice");
    assert_eq!(items[0]["url"], "https://mastodon.example/@alice/2");
    assert_eq!(items[0]["date_published"], "2024-01-02T00:00:00.000Z");
    assert_eq!(items[0]["authors"][0]["name"], "Alice");
}

#[tokio::test]
async fn test_feed_json_store_failure_returns_generic_500() {
    let (db, _temp_dir) = setup_db().await;
    let app = test_app(db.clone(), Config::for_testing());

    // Simulate the store going away out from under the serving path.
    db.pool().close().await;

    let response = app
        .clone()
        .oneshot(Request::get("/feed.json").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    assert_eq!(&bytes[..], b"Database error");

    // Liveness is independent of the store.
    let health = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_feed_json_respects_limit() {
    let (db, _temp_dir) = setup_db().await;

    let posts = vec![
        make_post("1", "2024-01-01T00:00:00.000Z"),
        make_post("2", "2024-01-02T00:00:00.000Z"),
        make_post("3", "2024-01-03T00:00:00.000Z"),
    ];
    upsert_posts(db.pool(), &posts)
        .await
        .expect("Failed to seed posts");

    let config = Config {
        feed_limit: 2,
        ..Config::for_testing()
    };
    let app = test_app(db, config);
    let response = app
        .oneshot(Request::get("/feed.json").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    let json = body_json(response).await;
    let items = json["items"].as_array().expect("items missing");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "3");
}
