//! Per-user, per-word occurrence counters

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use tally_types::LeaderboardEntry;

use super::super::Database;

/// Initialize the counts table
pub fn init_tables(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS counts (
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            word TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
            PRIMARY KEY (user_id, word)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_counts_word_count ON counts(word, count DESC)",
        [],
    )?;

    Ok(())
}

/// Add one to (user_id, word), creating the row at 1 if missing.
///
/// The latest display name is written to every row of the user so the
/// combined leaderboard always shows the most recent name.
pub(crate) fn upsert_increment(
    conn: &Connection,
    user_id: &str,
    username: &str,
    word: &str,
) -> SqliteResult<()> {
    conn.execute(
        "INSERT INTO counts (user_id, username, word, count)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(user_id, word) DO UPDATE SET
            count = count + 1,
            username = excluded.username",
        params![user_id, username, word],
    )?;

    conn.execute(
        "UPDATE counts SET username = ?2 WHERE user_id = ?1 AND username <> ?2",
        params![user_id, username],
    )?;

    Ok(())
}

impl Database {
    pub fn increment_count(&self, user_id: &str, username: &str, word: &str) -> SqliteResult<()> {
        let conn = self.conn();
        upsert_increment(&conn, user_id, username, word)
    }

    /// Count for one word; 0 when the user never said it
    pub fn get_count(&self, user_id: &str, word: &str) -> SqliteResult<i64> {
        let conn = self.conn();
        let count = conn
            .query_row(
                "SELECT count FROM counts WHERE user_id = ?1 AND word = ?2",
                params![user_id, word],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    /// Sum across all words; 0 when the user has no rows
    pub fn get_total(&self, user_id: &str) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COALESCE(SUM(count), 0) FROM counts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
    }

    #[cfg(test)]
    pub fn get_record(
        &self,
        user_id: &str,
        word: &str,
    ) -> SqliteResult<Option<tally_types::CounterRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, username, word, count FROM counts WHERE user_id = ?1 AND word = ?2",
            params![user_id, word],
            |row| {
                Ok(tally_types::CounterRecord {
                    actor_id: row.get(0)?,
                    display_name: row.get(1)?,
                    target: row.get(2)?,
                    count: row.get(3)?,
                })
            },
        )
        .optional()
    }

    /// Top users for one word. Ties keep first-insertion order.
    pub fn top_by_word(&self, word: &str, limit: usize) -> SqliteResult<Vec<LeaderboardEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, username, count FROM counts
             WHERE word = ?1 AND count > 0
             ORDER BY count DESC, rowid ASC
             LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![word, limit as i64], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Top users by total across all words. Ties keep first-insertion order.
    pub fn top_combined(&self, limit: usize) -> SqliteResult<Vec<LeaderboardEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, MAX(username), SUM(count) AS total FROM counts
             GROUP BY user_id
             HAVING total > 0
             ORDER BY total DESC, MIN(rowid) ASC
             LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<LeaderboardEntry> {
    Ok(LeaderboardEntry {
        actor_id: row.get(0)?,
        display_name: row.get(1)?,
        count: row.get(2)?,
    })
}
