//! Leaderboard command - ranked totals per target or combined

use crate::store::{CounterStore, LEADERBOARD_SIZE};
use tally_types::LeaderboardEntry;

/// Execute the leaderboard command
pub async fn execute(target: Option<&str>, store: &dyn CounterStore) -> String {
    match target {
        Some(target) => {
            let entries = store
                .top_by_target(target, LEADERBOARD_SIZE)
                .await
                .unwrap_or_else(|e| {
                    log::error!("[COMMANDS] leaderboard: {}", e);
                    Vec::new()
                });
            if entries.is_empty() {
                return format!("No data yet for \"{}\".", target);
            }
            format_entries(&format!("**Leaderboard for \"{}\"**", target), &entries)
        }
        None => {
            let entries = store.top_combined(LEADERBOARD_SIZE).await.unwrap_or_else(|e| {
                log::error!("[COMMANDS] combined leaderboard: {}", e);
                Vec::new()
            });
            if entries.is_empty() {
                return "No data yet.".to_string();
            }
            format_entries("**Combined leaderboard**", &entries)
        }
    }
}

/// Title line followed by `rank. name - count` lines
pub fn format_entries(title: &str, entries: &[LeaderboardEntry]) -> String {
    let mut reply = format!("{}\n", title);
    for (index, entry) in entries.iter().enumerate() {
        reply.push_str(&format!("{}. {} - {}\n", index + 1, entry.display_name, entry.count));
    }
    reply
}
