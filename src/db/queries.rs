use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{NewPost, Post};

/// Get the id of the most recently created post, if any.
///
/// This is the local high-water mark for timeline fetches; an empty store is
/// a valid state.
pub async fn most_recent_post_id(pool: &SqlitePool) -> Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT id FROM posts ORDER BY created_at DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .context("Failed to fetch most recent post id")?;

    Ok(row.map(|(id,)| id))
}

/// Upsert a batch of posts in a single transaction, returning the number of
/// records written.
///
/// An existing row keeps its original `created_at`; every other field is
/// overwritten with the incoming values, so re-ingesting the same id is
/// idempotent and edit-safe.
pub async fn upsert_posts(pool: &SqlitePool, posts: &[NewPost]) -> Result<usize> {
    if posts.is_empty() {
        return Ok(0);
    }

    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin upsert transaction")?;

    for post in posts {
        sqlx::query(
            r"
            INSERT INTO posts (
                id, created_at, edited_at, url, content, spoiler_text,
                account_id, account_username, account_display_name, account_url, raw
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                edited_at = excluded.edited_at,
                url = excluded.url,
                content = excluded.content,
                spoiler_text = excluded.spoiler_text,
                account_id = excluded.account_id,
                account_username = excluded.account_username,
                account_display_name = excluded.account_display_name,
                account_url = excluded.account_url,
                raw = excluded.raw
            ",
        )
        .bind(&post.id)
        .bind(&post.created_at)
        .bind(&post.edited_at)
        .bind(&post.url)
        .bind(&post.content)
        .bind(&post.spoiler_text)
        .bind(&post.account_id)
        .bind(&post.account_username)
        .bind(&post.account_display_name)
        .bind(&post.account_url)
        .bind(post.raw.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to upsert post")?;
    }

    tx.commit()
        .await
        .context("Failed to commit upsert transaction")?;

    Ok(posts.len())
}

/// Get up to `limit` posts ordered by creation time, newest first.
pub async fn get_recent_posts(pool: &SqlitePool, limit: i64) -> Result<Vec<Post>> {
    sqlx::query_as(
        r"
        SELECT id, created_at, edited_at, url, content, spoiler_text,
               account_id, account_username, account_display_name, account_url, raw
        FROM posts
        ORDER BY created_at DESC
        LIMIT ?
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch recent posts")
}

/// Count all stored posts.
pub async fn count_posts(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(count)
}
