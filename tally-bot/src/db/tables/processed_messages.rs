//! Ledger of (message, target) pairs whose occurrences have already been counted

use rusqlite::{params, Connection, Result as SqliteResult};

use super::super::Database;
use super::counts::upsert_increment;

/// Initialize the processed_messages table
pub fn init_tables(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS processed_messages (
            message_id INTEGER NOT NULL,
            target TEXT NOT NULL,
            channel_id INTEGER NOT NULL,
            processed_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (message_id, target)
        )",
        [],
    )?;
    Ok(())
}

impl Database {
    /// Claim each target of a message and apply its increments, atomically.
    ///
    /// `words` holds one entry per occurrence. A target already claimed for
    /// this message (replayed delivery, or backfill over counted history) is
    /// skipped; targets configured since the message was first counted are
    /// still applied. Returns the number of increments applied.
    pub fn apply_message_occurrences(
        &self,
        message_id: u64,
        channel_id: u64,
        user_id: &str,
        username: &str,
        words: &[String],
    ) -> SqliteResult<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut applied = 0;

        let mut seen: Vec<&str> = Vec::new();
        for word in words {
            if seen.contains(&word.as_str()) {
                continue;
            }
            seen.push(word);

            let claimed = tx.execute(
                "INSERT OR IGNORE INTO processed_messages (message_id, target, channel_id)
                 VALUES (?1, ?2, ?3)",
                params![message_id as i64, word, channel_id as i64],
            )?;
            if claimed == 0 {
                continue;
            }

            for _ in words.iter().filter(|w| *w == word) {
                upsert_increment(&tx, user_id, username, word)?;
                applied += 1;
            }
        }

        tx.commit()?;
        Ok(applied)
    }

    #[cfg(test)]
    pub fn is_message_processed(&self, message_id: u64, target: &str) -> SqliteResult<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM processed_messages WHERE message_id = ?1 AND target = ?2)",
            params![message_id as i64, target],
            |row| row.get(0),
        )
    }

    #[cfg(test)]
    pub fn processed_claim_count(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM processed_messages", [], |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_applies_each_word_once() {
        let db = Database::new(":memory:").unwrap();
        let applied = db
            .apply_message_occurrences(100, 1, "u1", "Alice", &words(&["bru", "ok", "bru"]))
            .unwrap();
        assert_eq!(applied, 3);
        assert_eq!(db.get_count("u1", "bru").unwrap(), 2);
        assert_eq!(db.get_count("u1", "ok").unwrap(), 1);
        assert!(db.is_message_processed(100, "bru").unwrap());
        assert!(db.is_message_processed(100, "ok").unwrap());
        assert_eq!(db.processed_claim_count().unwrap(), 2);
    }

    #[test]
    fn test_replay_is_ignored() {
        let db = Database::new(":memory:").unwrap();
        let hits = words(&["bru"]);
        assert_eq!(db.apply_message_occurrences(100, 1, "u1", "Alice", &hits).unwrap(), 1);
        assert_eq!(db.apply_message_occurrences(100, 1, "u1", "Alice", &hits).unwrap(), 0);
        assert_eq!(db.get_count("u1", "bru").unwrap(), 1);
        assert_eq!(db.processed_claim_count().unwrap(), 1);
    }

    #[test]
    fn test_new_target_on_counted_message_is_applied() {
        let db = Database::new(":memory:").unwrap();
        assert_eq!(
            db.apply_message_occurrences(100, 1, "u1", "Alice", &words(&["bru"])).unwrap(),
            1
        );
        assert_eq!(
            db.apply_message_occurrences(100, 1, "u1", "Alice", &words(&["bru", "ok", "ok"]))
                .unwrap(),
            2
        );
        assert_eq!(db.get_count("u1", "bru").unwrap(), 1);
        assert_eq!(db.get_count("u1", "ok").unwrap(), 2);
    }

    #[test]
    fn test_large_snowflake_ids() {
        let db = Database::new(":memory:").unwrap();
        let id = 1_234_567_890_123_456_789u64;
        assert_eq!(db.apply_message_occurrences(id, 42, "u1", "Alice", &words(&["bru"])).unwrap(), 1);
        assert!(db.is_message_processed(id, "bru").unwrap());
        assert!(!db.is_message_processed(id, "ok").unwrap());
        assert!(!db.is_message_processed(id + 1, "bru").unwrap());
    }
}
