//! Backfill traversal: replays a scope's message history through ingestion.
//!
//! Each channel is paged backward from the newest message with a strictly
//! decreasing `before` cursor until a page comes back empty. A failed fetch
//! (after bounded retries) aborts only that channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use tally_types::{BackfillReport, ChannelOutcome, ObservedMessage};

use crate::channels::util::parse_retry_after;
use crate::ingestion::Ingestor;

/// Largest page the platform serves
pub const MAX_PAGE_SIZE: u8 = 100;

/// Upper bound for any single wait between fetch attempts
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// A channel whose history can be paged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryChannel {
    pub id: u64,
    pub name: String,
}

/// Paginated, newest-first access to a scope's message archive.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Text-capable channels in the scope.
    async fn text_channels(&self) -> Result<Vec<HistoryChannel>, String>;

    /// Up to `limit` messages strictly older than `before` (or the newest
    /// messages when `before` is `None`). An empty page means no more history.
    async fn fetch_page(
        &self,
        channel_id: u64,
        before: Option<u64>,
        limit: u8,
    ) -> Result<Vec<ObservedMessage>, String>;
}

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    pub page_size: u8,
    /// Per-channel guard against sources that never run dry
    pub max_pages: u64,
    /// Channels traversed at the same time
    pub concurrency: usize,
    pub fetch_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_pages: 100_000,
            concurrency: 1,
            fetch_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Walk every text channel of `source` and ingest its history.
///
/// Only listing the channels can fail the whole run; per-channel failures
/// are reported in the returned outcomes.
pub async fn run_backfill(
    source: &dyn HistorySource,
    ingestor: &Ingestor,
    options: &BackfillOptions,
) -> Result<BackfillReport, String> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let channels = source.text_channels().await?;

    log::info!(
        "[BACKFILL] Starting over {} channels (page size {}, concurrency {})",
        channels.len(),
        options.page_size,
        options.concurrency
    );

    let outcomes: Vec<ChannelOutcome> = stream::iter(channels)
        .map(move |channel| async move {
            traverse_channel(source, ingestor, &channel, options).await
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let report = BackfillReport {
        started_at,
        finished_at: chrono::Utc::now().to_rfc3339(),
        channels: outcomes,
    };

    log::info!(
        "[BACKFILL] Finished: {} messages scanned, {} counted, {} occurrences, {} channels failed",
        report.messages_scanned(),
        report.messages_counted(),
        report.occurrences(),
        report.failed().count()
    );
    log::debug!(
        "[BACKFILL] Report: {}",
        serde_json::to_string(&report).unwrap_or_default()
    );

    Ok(report)
}

/// Page one channel to the end of its history.
pub async fn traverse_channel(
    source: &dyn HistorySource,
    ingestor: &Ingestor,
    channel: &HistoryChannel,
    options: &BackfillOptions,
) -> ChannelOutcome {
    let mut outcome = ChannelOutcome::new(channel.id, &channel.name);
    let mut cursor: Option<u64> = None;
    let page_size = options.page_size.clamp(1, MAX_PAGE_SIZE);

    loop {
        if outcome.pages >= options.max_pages {
            log::warn!(
                "[BACKFILL] #{}: page limit {} reached, stopping",
                channel.name,
                options.max_pages
            );
            outcome.error = Some(format!("page limit {} reached", options.max_pages));
            break;
        }

        let page = match fetch_with_retry(source, channel, cursor, page_size, options).await {
            Ok(page) => page,
            Err(e) => {
                log::error!("[BACKFILL] #{}: aborting channel: {}", channel.name, e);
                outcome.error = Some(e);
                break;
            }
        };

        let Some(oldest) = page.iter().map(|m| m.message_id).min() else {
            break;
        };

        if let Some(previous) = cursor {
            if oldest >= previous {
                log::error!(
                    "[BACKFILL] #{}: cursor did not advance ({} >= {})",
                    channel.name,
                    oldest,
                    previous
                );
                outcome.error = Some(format!("history cursor did not advance past {}", previous));
                break;
            }
        }

        outcome.pages += 1;
        for message in &page {
            outcome.messages_scanned += 1;
            let applied = ingestor.ingest(message).await;
            if applied > 0 {
                outcome.messages_counted += 1;
                outcome.occurrences += applied as u64;
            }
        }

        cursor = Some(oldest);
    }

    log::info!(
        "[BACKFILL] #{}: {} pages, {} messages, {} occurrences{}",
        channel.name,
        outcome.pages,
        outcome.messages_scanned,
        outcome.occurrences,
        if outcome.is_complete() { "" } else { " (incomplete)" }
    );
    outcome
}

async fn fetch_with_retry(
    source: &dyn HistorySource,
    channel: &HistoryChannel,
    before: Option<u64>,
    limit: u8,
    options: &BackfillOptions,
) -> Result<Vec<ObservedMessage>, String> {
    let mut attempt = 0u32;
    loop {
        match source.fetch_page(channel.id, before, limit).await {
            Ok(page) => return Ok(page),
            Err(e) if attempt < options.fetch_retries => {
                let delay = retry_delay(&e, attempt, options.retry_base_delay);
                attempt += 1;
                log::warn!(
                    "[BACKFILL] #{}: fetch failed ({}), retry {}/{} in {:?}",
                    channel.name,
                    e,
                    attempt,
                    options.fetch_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wait before retry number `attempt + 1`: the server's hint when the error
/// carries one, else `base` doubled per attempt. Capped at `MAX_RETRY_DELAY`.
pub(crate) fn retry_delay(error: &str, attempt: u32, base: Duration) -> Duration {
    let delay = match parse_retry_after(error) {
        Some(secs) => Duration::from_secs(secs),
        None => base
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(MAX_RETRY_DELAY),
    };
    delay.min(MAX_RETRY_DELAY)
}

/// Guilds with a backfill in flight.
#[derive(Default)]
pub struct RunningBackfills {
    guilds: DashMap<u64, ()>,
}

impl RunningBackfills {
    /// Mark `guild_id` as running. `None` if a backfill already runs there.
    pub fn try_start(self: &Arc<Self>, guild_id: u64) -> Option<BackfillGuard> {
        match self.guilds.entry(guild_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(BackfillGuard {
                    registry: Arc::clone(self),
                    guild_id,
                })
            }
        }
    }

    #[cfg(test)]
    pub fn is_running(&self, guild_id: u64) -> bool {
        self.guilds.contains_key(&guild_id)
    }
}

/// Clears the running mark when dropped.
pub struct BackfillGuard {
    registry: Arc<RunningBackfills>,
    guild_id: u64,
}

impl Drop for BackfillGuard {
    fn drop(&mut self) {
        self.registry.guilds.remove(&self.guild_id);
    }
}
