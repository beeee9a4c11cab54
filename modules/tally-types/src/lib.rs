//! Shared types for the word tally bot: observed messages, occurrence events,
//! counter records and backfill reports.

use serde::{Deserialize, Serialize};

// =====================================================
// Ingestion Types
// =====================================================

/// A chat message as seen by ingestion, either live or replayed from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedMessage {
    pub message_id: u64,
    pub channel_id: u64,
    pub author_id: String,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
}

/// One qualifying token-to-target match. Carries no identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceEvent {
    pub actor_id: String,
    pub actor_name: String,
    pub target: String,
}

// =====================================================
// Counter Types
// =====================================================

/// Stored counter for a single (actor, target) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub actor_id: String,
    pub display_name: String,
    pub target: String,
    pub count: i64,
}

/// One row of a ranked leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub actor_id: String,
    pub display_name: String,
    pub count: i64,
}

// =====================================================
// Backfill Types
// =====================================================

/// Result of traversing one channel's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel_id: u64,
    pub channel_name: String,
    pub pages: u64,
    pub messages_scanned: u64,
    pub messages_counted: u64,
    pub occurrences: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn new(channel_id: u64, channel_name: impl Into<String>) -> Self {
        Self {
            channel_id,
            channel_name: channel_name.into(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of a backfill run over a whole scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackfillReport {
    pub started_at: String,
    pub finished_at: String,
    pub channels: Vec<ChannelOutcome>,
}

impl BackfillReport {
    pub fn messages_scanned(&self) -> u64 {
        self.channels.iter().map(|c| c.messages_scanned).sum()
    }

    pub fn messages_counted(&self) -> u64 {
        self.channels.iter().map(|c| c.messages_counted).sum()
    }

    pub fn occurrences(&self) -> u64 {
        self.channels.iter().map(|c| c.occurrences).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ChannelOutcome> {
        self.channels.iter().filter(|c| !c.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.channels.iter().all(ChannelOutcome::is_complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut a = ChannelOutcome::new(1, "general");
        a.messages_scanned = 10;
        a.messages_counted = 3;
        a.occurrences = 4;
        let mut b = ChannelOutcome::new(2, "memes");
        b.messages_scanned = 5;
        b.error = Some("Rate limited".to_string());

        let report = BackfillReport {
            channels: vec![a, b],
            ..Default::default()
        };
        assert_eq!(report.messages_scanned(), 15);
        assert_eq!(report.messages_counted(), 3);
        assert_eq!(report.occurrences(), 4);
        assert!(!report.is_complete());
        assert_eq!(report.failed().count(), 1);
    }

    #[test]
    fn test_outcome_error_skipped_when_absent() {
        let json = serde_json::to_value(ChannelOutcome::new(7, "x")).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["channel_id"], 7);
    }

    #[test]
    fn test_empty_report_is_complete() {
        assert!(BackfillReport::default().is_complete());
    }
}
