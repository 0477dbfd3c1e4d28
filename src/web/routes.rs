use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use super::AppState;
use crate::db::get_recent_posts;
use crate::feed;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(health))
        .route("/feed.json", get(feed_json))
}

async fn index() -> &'static str {
    "mastofeed: JSON Feed available at /feed.json\n"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Serve the accumulated timeline as a JSON Feed document.
///
/// A store failure here is independent of the polling path and surfaces as a
/// generic server error.
async fn feed_json(State(state): State<AppState>) -> Response {
    let posts = match get_recent_posts(state.db.pool(), state.config.feed_limit).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to fetch posts for feed: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let document = feed::build_json_feed(&posts, &state.config);

    (
        [(header::CONTENT_TYPE, "application/feed+json")],
        Json(document),
    )
        .into_response()
}
