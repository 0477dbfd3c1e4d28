//! Mastofeed library.
//!
//! A service that polls a Mastodon home timeline on a cron cadence, stores
//! the statuses in SQLite, and serves them back out as a JSON Feed document.

pub mod config;
pub mod db;
pub mod feed;
pub mod mastodon;
pub mod timeline;
pub mod web;
