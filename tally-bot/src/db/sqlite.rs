//! SQLite connection management for the counter store.

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Result as SqliteResult};

pub type DbConn<'a> = MutexGuard<'a, Connection>;

/// Single serialized SQLite connection.
///
/// Every statement runs under the mutex, so each upsert is an indivisible
/// read-modify-write with respect to every other caller.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        let conn = if database_url == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = std::path::Path::new(database_url).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        log::warn!("[DB] Could not create {}: {}", parent.display(), e);
                    }
                }
            }
            Connection::open(database_url)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    pub fn conn(&self) -> DbConn<'_> {
        self.conn.lock()
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn();
        super::tables::counts::init_tables(&conn)?;
        super::tables::processed_messages::init_tables(&conn)?;
        Ok(())
    }
}
