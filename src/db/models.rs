use serde::{Deserialize, Serialize};

/// A Mastodon status persisted from the home timeline.
///
/// Author attributes are denormalized at ingest time and are not kept in
/// sync with later profile edits. `raw` holds the full original status as
/// JSON text so new fields (attachments, avatars) can be rendered without a
/// schema migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub created_at: String,
    pub edited_at: Option<String>,
    pub url: String,
    pub content: String,
    pub spoiler_text: String,
    pub account_id: String,
    pub account_username: String,
    pub account_display_name: String,
    pub account_url: String,
    pub raw: String,
}

impl Post {
    /// Parse the preserved original status, if it is still valid JSON.
    #[must_use]
    pub fn raw_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.raw).ok()
    }
}

/// A normalized timeline record ready for upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub id: String,
    pub created_at: String,
    pub edited_at: Option<String>,
    pub url: String,
    pub content: String,
    pub spoiler_text: String,
    pub account_id: String,
    pub account_username: String,
    pub account_display_name: String,
    pub account_url: String,
    pub raw: serde_json::Value,
}
