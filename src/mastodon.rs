use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::Config;

/// Client for the Mastodon REST API.
///
/// Statuses are fetched as raw JSON values rather than a typed schema so the
/// full remote record can be persisted unchanged alongside the extracted
/// fields.
#[derive(Debug, Clone)]
pub struct MastodonClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MastodonClient {
    /// Build a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.mastodon_base_url.trim_end_matches('/').to_string(),
            access_token: config.mastodon_access_token.clone(),
        })
    }

    /// Fetch up to `limit` statuses from the home timeline in the API's
    /// native reverse-chronological order. With `since_id` set, only statuses
    /// strictly newer than that id are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a JSON
    /// array of statuses.
    pub async fn list_home_timeline(
        &self,
        limit: u32,
        since_id: Option<&str>,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/api/v1/timelines/home", self.base_url);

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, "mastofeed/0.1")
            .bearer_auth(&self.access_token)
            .query(&[("limit", limit.to_string())]);

        if let Some(id) = since_id {
            request = request.query(&[("since_id", id)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to fetch home timeline")?;

        if !response.status().is_success() {
            anyhow::bail!("Timeline fetch failed with status {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse timeline response")
    }
}
