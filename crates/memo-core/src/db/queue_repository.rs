//! Delete-tombstone queue repository

use rusqlite::{params, Row};

use crate::error::Result;
use crate::models::{DeleteTombstone, UserId};
use crate::util::truncate_error;

use super::Database;

/// Hard cap on stored delivery-error text
const MAX_ERROR_LEN: usize = 500;

/// Trait for tombstone queue operations
///
/// Entries are only ever created by `NoteRepository::delete_permanent`;
/// the queue itself just hands them to the sync engine and records the
/// outcome.
pub trait TombstoneRepository {
    /// Pending tombstones for a user, oldest first
    fn list(&self, user_id: UserId, limit: usize) -> Result<Vec<DeleteTombstone>>;

    /// Drop a tombstone after the remote delete was acknowledged
    fn remove(&self, id: i64) -> Result<()>;

    /// Record a failed delivery attempt
    fn bump_attempt(&self, id: i64, error: &str) -> Result<()>;

    /// Number of queued tombstones for a user
    fn count(&self, user_id: UserId) -> Result<usize>;
}

/// `SQLite` implementation of `TombstoneRepository`
pub struct SqliteTombstoneRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteTombstoneRepository<'a> {
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn parse_tombstone(row: &Row<'_>) -> rusqlite::Result<DeleteTombstone> {
        let note_local_id: Option<String> = row.get(2)?;
        Ok(DeleteTombstone {
            id: row.get(0)?,
            user_id: UserId(row.get(1)?),
            note_local_id: note_local_id.and_then(|id| id.parse().ok()),
            remote_id: row.get(3)?,
            try_count: row.get(4)?,
            last_error: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl TombstoneRepository for SqliteTombstoneRepository<'_> {
    fn list(&self, user_id: UserId, limit: usize) -> Result<Vec<DeleteTombstone>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, note_local_id, remote_id, try_count, last_error, created_at
             FROM sync_queue WHERE user_id = ? ORDER BY created_at ASC LIMIT ?",
        )?;

        let tombstones = stmt
            .query_map(
                params![user_id.as_i64(), limit as i64],
                Self::parse_tombstone,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tombstones)
    }

    fn remove(&self, id: i64) -> Result<()> {
        self.db
            .lock()
            .execute("DELETE FROM sync_queue WHERE id = ?", params![id])?;
        Ok(())
    }

    fn bump_attempt(&self, id: i64, error: &str) -> Result<()> {
        self.db.lock().execute(
            "UPDATE sync_queue SET try_count = try_count + 1, last_error = ? WHERE id = ?",
            params![truncate_error(error, MAX_ERROR_LEN), id],
        )?;
        Ok(())
    }

    fn count(&self, user_id: UserId) -> Result<usize> {
        let count: i64 = self.db.lock().query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE user_id = ?",
            params![user_id.as_i64()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
