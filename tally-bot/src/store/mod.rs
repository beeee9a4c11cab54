//! Counter store capability used by ingestion, backfill and commands.

use async_trait::async_trait;
use tally_types::{LeaderboardEntry, ObservedMessage};

use crate::db::Database;

/// Maximum rows shown on a leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

/// Durable (actor, target) -> count mapping.
///
/// Implementations must make every increment atomic per key.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(
        &self,
        actor_id: &str,
        display_name: &str,
        target: &str,
    ) -> Result<(), String>;

    /// Apply one increment per entry of `targets`, skipping targets already
    /// applied for `message`. Returns the number of increments applied.
    async fn apply_message(
        &self,
        message: &ObservedMessage,
        targets: &[String],
    ) -> Result<usize, String>;

    async fn get_count(&self, actor_id: &str, target: &str) -> Result<i64, String>;

    async fn get_total(&self, actor_id: &str) -> Result<i64, String>;

    async fn top_by_target(&self, target: &str, n: usize) -> Result<Vec<LeaderboardEntry>, String>;

    async fn top_combined(&self, n: usize) -> Result<Vec<LeaderboardEntry>, String>;
}

#[async_trait]
impl CounterStore for Database {
    async fn increment(
        &self,
        actor_id: &str,
        display_name: &str,
        target: &str,
    ) -> Result<(), String> {
        self.increment_count(actor_id, display_name, target)
            .map_err(|e| format!("Failed to increment {}/{}: {}", actor_id, target, e))
    }

    async fn apply_message(
        &self,
        message: &ObservedMessage,
        targets: &[String],
    ) -> Result<usize, String> {
        self.apply_message_occurrences(
            message.message_id,
            message.channel_id,
            &message.author_id,
            &message.author_name,
            targets,
        )
        .map_err(|e| format!("Failed to apply message {}: {}", message.message_id, e))
    }

    async fn get_count(&self, actor_id: &str, target: &str) -> Result<i64, String> {
        Database::get_count(self, actor_id, target)
            .map_err(|e| format!("Failed to read count: {}", e))
    }

    async fn get_total(&self, actor_id: &str) -> Result<i64, String> {
        Database::get_total(self, actor_id).map_err(|e| format!("Failed to read total: {}", e))
    }

    async fn top_by_target(&self, target: &str, n: usize) -> Result<Vec<LeaderboardEntry>, String> {
        self.top_by_word(target, n)
            .map_err(|e| format!("Failed to query leaderboard: {}", e))
    }

    async fn top_combined(&self, n: usize) -> Result<Vec<LeaderboardEntry>, String> {
        Database::top_combined(self, n)
            .map_err(|e| format!("Failed to query combined leaderboard: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn message(id: u64, author: &str) -> ObservedMessage {
        ObservedMessage {
            message_id: id,
            channel_id: 1,
            author_id: author.to_string(),
            author_name: author.to_uppercase(),
            author_is_bot: false,
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn test_store_through_trait_object() {
        let store: Arc<dyn CounterStore> = Arc::new(Database::new(":memory:").unwrap());
        store.increment("u1", "U1", "bru").await.unwrap();
        assert_eq!(store.apply_message(&message(5, "u1"), &["bru".to_string()]).await.unwrap(), 1);
        assert_eq!(store.get_count("u1", "bru").await.unwrap(), 2);
        assert_eq!(store.get_total("u1").await.unwrap(), 2);
        assert_eq!(store.top_by_target("bru", LEADERBOARD_SIZE).await.unwrap().len(), 1);
        assert_eq!(store.top_combined(LEADERBOARD_SIZE).await.unwrap()[0].count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store: Arc<dyn CounterStore> = Arc::new(Database::new(":memory:").unwrap());
        let mut handles = Vec::new();
        for i in 0..8u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..25u64 {
                    let msg = message(i * 1000 + j, "u1");
                    store.apply_message(&msg, &["bru".to_string()]).await.unwrap();
                    store.increment("u1", "U1", "ok").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get_count("u1", "bru").await.unwrap(), 200);
        assert_eq!(store.get_count("u1", "ok").await.unwrap(), 200);
    }
}
