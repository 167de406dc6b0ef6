//! Database connection management

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use crate::error::Result;

use super::migrations;

/// SQLite database wrapper
///
/// Opens run migrations automatically. The connection sits behind a mutex
/// so repositories stay usable from spawned scheduler tasks; repository
/// methods hold the guard only for the duration of their statements and
/// never across an await point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        // WAL is unavailable for in-memory databases; best effort.
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Borrow the underlying connection
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let version: i32 = db
            .lock()
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(version >= 1);
    }

    #[test]
    fn test_reopen_existing_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("memo.db");

        drop(Database::open(&path).unwrap());
        // Second open must tolerate the already-migrated schema.
        let db = Database::open(&path).unwrap();

        let guest: String = db
            .lock()
            .query_row("SELECT username FROM users WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(guest, "guest");
    }
}
