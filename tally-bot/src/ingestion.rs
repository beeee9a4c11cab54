//! Live ingestion: detection over one message, applied to the counter store.
//!
//! Backfill replays historical messages through the same `Ingestor`, so both
//! paths share the skip rules and the de-duplication ledger.

use std::sync::Arc;

use tally_types::{ObservedMessage, OccurrenceEvent};

use crate::commands;
use crate::detection::Detector;
use crate::store::CounterStore;

pub struct Ingestor {
    detector: Detector,
    store: Arc<dyn CounterStore>,
    command_prefix: String,
}

impl Ingestor {
    pub fn new(detector: Detector, store: Arc<dyn CounterStore>, command_prefix: &str) -> Self {
        Self {
            detector,
            store,
            command_prefix: command_prefix.to_string(),
        }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Occurrence events a message would produce, without touching the store.
    pub fn occurrences(&self, message: &ObservedMessage) -> Vec<OccurrenceEvent> {
        if message.author_is_bot || commands::parse(&message.content, &self.command_prefix).is_some()
        {
            return Vec::new();
        }

        self.detector
            .scan(&message.content)
            .into_iter()
            .map(|target| OccurrenceEvent {
                actor_id: message.author_id.clone(),
                actor_name: message.author_name.clone(),
                target,
            })
            .collect()
    }

    /// Apply a message's occurrences. Returns the number of increments
    /// applied: 0 for skipped, already counted, or failed messages.
    ///
    /// Store failures are logged and swallowed.
    pub async fn ingest(&self, message: &ObservedMessage) -> usize {
        let events = self.occurrences(message);
        if events.is_empty() {
            return 0;
        }

        let targets: Vec<String> = events.into_iter().map(|e| e.target).collect();
        match self.store.apply_message(message, &targets).await {
            Ok(0) => {
                log::debug!("[INGEST] Message {} already counted", message.message_id);
                0
            }
            Ok(applied) => {
                log::debug!(
                    "[INGEST] {} ({}) +{} in message {}",
                    message.author_name,
                    message.author_id,
                    applied,
                    message.message_id
                );
                applied
            }
            Err(e) => {
                log::error!("[INGEST] {}", e);
                0
            }
        }
    }
}
