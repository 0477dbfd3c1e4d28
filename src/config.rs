use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Mastodon
    pub mastodon_base_url: String,
    pub mastodon_access_token: String,
    pub http_timeout: Duration,

    // Polling
    pub cron_schedule: String,

    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,

    // Feed
    pub feed_title: String,
    pub feed_description: Option<String>,
    pub feed_home_page_url: Option<String>,
    pub feed_feed_url: Option<String>,
    pub feed_limit: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Mastodon
            mastodon_base_url: required_env("MASTODON_BASE_URL")?,
            mastodon_access_token: required_env("MASTODON_ACCESS_TOKEN")?,
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),

            // Polling
            cron_schedule: env_or_default("CRON_SCHEDULE", "0 */5 * * * *"),

            // Database
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/mastofeed.sqlite",
            )),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 3000)?,

            // Feed
            feed_title: env_or_default("FEED_TITLE", "Mastodon timeline"),
            feed_description: optional_env("FEED_DESCRIPTION"),
            feed_home_page_url: optional_env("FEED_HOME_PAGE_URL"),
            feed_feed_url: optional_env("FEED_FEED_URL"),
            feed_limit: parse_env_i64("FEED_LIMIT", 100)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.mastodon_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "MASTODON_BASE_URL".to_string(),
                message: format!("must be a valid URL, got '{}'", self.mastodon_base_url),
            });
        }
        if self.mastodon_access_token.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "MASTODON_ACCESS_TOKEN".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if let Err(e) = cron::Schedule::from_str(&self.cron_schedule) {
            return Err(ConfigError::InvalidValue {
                name: "CRON_SCHEDULE".to_string(),
                message: format!("not a valid cron expression: {e}"),
            });
        }
        if !(1..=1000).contains(&self.feed_limit) {
            return Err(ConfigError::InvalidValue {
                name: "FEED_LIMIT".to_string(),
                message: "must be between 1 and 1000".to_string(),
            });
        }
        Ok(())
    }

    /// A minimal valid configuration for use in tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            mastodon_base_url: "https://mastodon.example".to_string(),
            mastodon_access_token: "test-token".to_string(),
            http_timeout: Duration::from_secs(10),
            cron_schedule: "0 */5 * * * *".to_string(),
            database_path: PathBuf::from("./data/test.sqlite"),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            feed_title: "Mastodon timeline".to_string(),
            feed_description: None,
            feed_home_page_url: None,
            feed_feed_url: None,
            feed_limit: 100,
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
