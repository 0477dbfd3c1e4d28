use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::db::Post;

pub const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// A JSON Feed 1.1 document.
#[derive(Debug, Serialize)]
pub struct JsonFeed {
    pub version: &'static str,
    pub id: String,
    pub title: String,
    pub generator: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content_html: String,
    pub date_published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub authors: Vec<FeedAuthor>,
}

#[derive(Debug, Serialize)]
pub struct FeedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Render stored posts (newest first) into a JSON Feed document.
#[must_use]
pub fn build_json_feed(posts: &[Post], config: &Config) -> JsonFeed {
    JsonFeed {
        version: JSON_FEED_VERSION,
        id: config
            .feed_feed_url
            .clone()
            .or_else(|| config.feed_home_page_url.clone())
            .unwrap_or_else(|| config.mastodon_base_url.clone()),
        title: config.feed_title.clone(),
        generator: "mastofeed",
        home_page_url: config
            .feed_home_page_url
            .clone()
            .or_else(|| Some(config.mastodon_base_url.clone())),
        feed_url: config.feed_feed_url.clone(),
        description: config.feed_description.clone(),
        items: posts.iter().map(render_item).collect(),
    }
}

fn render_item(post: &Post) -> FeedItem {
    let raw = post.raw_value();

    let title = if post.account_display_name.is_empty() {
        post.account_username.clone()
    } else {
        post.account_display_name.clone()
    };

    let attachments_html = raw.as_ref().map(render_attachments).unwrap_or_default();

    let avatar = raw
        .as_ref()
        .and_then(|r| r.get("account"))
        .and_then(|a| a.get("avatar"))
        .and_then(Value::as_str)
        .map(ToString::to_string);

    FeedItem {
        id: post.id.clone(),
        url: post.url.clone(),
        title,
        content_html: format!("{}{attachments_html}", post.content),
        date_published: post.created_at.clone(),
        summary: (!post.spoiler_text.is_empty()).then(|| post.spoiler_text.clone()),
        authors: vec![FeedAuthor {
            name: if post.account_display_name.is_empty() {
                post.account_username.clone()
            } else {
                post.account_display_name.clone()
            },
            url: (!post.account_url.is_empty()).then(|| post.account_url.clone()),
            avatar,
        }],
    }
}

/// Render markup for the media attachments preserved in the raw status.
fn render_attachments(raw: &Value) -> String {
    let Some(attachments) = raw.get("media_attachments").and_then(Value::as_array) else {
        return String::new();
    };

    let mut html = String::new();
    for attachment in attachments {
        let Some(url) = attachment.get("url").and_then(Value::as_str) else {
            continue;
        };
        let url = html_escape(url);
        let description = html_escape(
            attachment
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or(""),
        );

        match attachment.get("type").and_then(Value::as_str) {
            Some("image") => {
                html.push_str(&format!(r#"<p><img src="{url}" alt="{description}"></p>"#));
            }
            Some("video" | "gifv") => {
                html.push_str(&format!(r#"<p><video src="{url}" controls></video></p>"#));
            }
            Some("audio") => {
                html.push_str(&format!(r#"<p><audio src="{url}" controls></audio></p>"#));
            }
            _ => {
                html.push_str(&format!(r#"<p><a href="{url}">{url}</a></p>"#));
            }
        }
    }
    html
}

/// Escape HTML attribute/text special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
