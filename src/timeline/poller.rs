use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use cron::Schedule;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::db::{self, Database, NewPost};
use crate::mastodon::MastodonClient;

/// Page size for each timeline fetch window.
pub const POLL_LIMIT: u32 = 40;

/// Run one reconciliation cycle against the home timeline, returning the
/// number of records upserted.
///
/// Two windows are fetched and merged:
/// - the newest [`POLL_LIMIT`] statuses unconditionally, which catches edits
///   and reblogs that surfaced an already-stored status back into the recent
///   window;
/// - everything strictly newer than the local high-water mark, which catches
///   new statuses beyond the first page.
///
/// The overlap between the windows is redundant on purpose; the upsert is
/// idempotent, and narrowing either window reintroduces a miss. Candidates
/// are normalized, deduplicated by id keeping the first occurrence in merge
/// order, and written in one batch.
///
/// # Errors
///
/// Network and store errors propagate to the caller; retry is the
/// scheduler's concern (try again next tick).
pub async fn sync_timeline_once(client: &MastodonClient, db: &Database) -> Result<usize> {
    let high_water_mark = db::most_recent_post_id(db.pool()).await?;

    let mut candidates = client.list_home_timeline(POLL_LIMIT, None).await?;

    if let Some(since_id) = high_water_mark.as_deref() {
        let newer = client.list_home_timeline(POLL_LIMIT, Some(since_id)).await?;
        candidates.extend(newer);
    }

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for status in &candidates {
        let Some(record) = normalize_status(status) else {
            debug!("Dropping timeline entry without id or url");
            continue;
        };
        if seen.insert(record.id.clone()) {
            records.push(record);
        }
    }

    db::upsert_posts(db.pool(), &records).await
}

/// Normalize a raw timeline status into an ingestible record.
///
/// A reblog wraps the original status; the original is what gets ingested
/// and the wrapper is discarded. Returns `None` for entries that lack an id
/// or a usable permalink. Missing optional fields fall back to empty strings
/// or the current time rather than failing the batch.
fn normalize_status(status: &Value) -> Option<NewPost> {
    let item = match status.get("reblog") {
        Some(reblog) if reblog.is_object() => reblog,
        _ => status,
    };

    let id = string_field(item, "id");
    if id.is_empty() {
        return None;
    }

    let mut url = string_field(item, "url");
    if url.is_empty() {
        url = string_field(item, "uri");
    }
    if url.is_empty() {
        return None;
    }

    let account = item.get("account");

    Some(NewPost {
        id,
        created_at: parse_timestamp(item.get("created_at"))
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        edited_at: parse_timestamp(item.get("edited_at"))
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        url,
        content: string_field(item, "content"),
        spoiler_text: string_field(item, "spoiler_text"),
        account_id: account.map(|a| string_field(a, "id")).unwrap_or_default(),
        account_username: account.map(|a| string_field(a, "acct")).unwrap_or_default(),
        account_display_name: account
            .map(|a| string_field(a, "display_name"))
            .unwrap_or_default(),
        account_url: account.map(|a| string_field(a, "url")).unwrap_or_default(),
        raw: item.clone(),
    })
}

/// Extract a field as a string, tolerating numeric ids from older servers.
fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Drives reconciliation cycles on a cron cadence with at most one cycle in
/// flight at a time.
#[derive(Clone)]
pub struct TimelinePoller {
    client: MastodonClient,
    db: Database,
    running: Arc<AtomicBool>,
}

impl TimelinePoller {
    #[must_use]
    pub fn new(client: MastodonClient, db: Database) -> Self {
        Self {
            client,
            db,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attempt one reconciliation cycle.
    ///
    /// Returns `None` when a cycle is already in flight; the tick is dropped,
    /// not queued.
    pub async fn try_sync(&self) -> Option<Result<usize>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Timeline sync already running, skipping tick");
            return None;
        }

        let result = sync_timeline_once(&self.client, &self.db).await;
        self.running.store(false, Ordering::SeqCst);
        Some(result)
    }

    /// Run the polling loop until cancelled: one attempt immediately, then
    /// one per cron tick (evaluated in UTC).
    ///
    /// Cycle failures are logged and the schedule continues. Cancellation is
    /// only honored between cycles, so an in-flight cycle finishes naturally.
    pub async fn run(&self, schedule: &Schedule, shutdown: CancellationToken) {
        self.sync_and_log().await;

        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                info!("Cron schedule has no upcoming ticks, stopping poller");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();

            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Timeline poller stopped");
                    return;
                }
                () = tokio::time::sleep(wait) => {}
            }

            self.sync_and_log().await;
        }
    }

    async fn sync_and_log(&self) {
        match self.try_sync().await {
            Some(Ok(count)) if count > 0 => info!(upserted = count, "Timeline sync complete"),
            Some(Ok(_)) => debug!("Timeline sync complete, nothing new"),
            Some(Err(e)) => error!("Timeline sync failed: {e:#}"),
            None => {}
        }
    }
}
