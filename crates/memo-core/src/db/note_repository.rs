//! Note repository implementation
//!
//! Every mutator here upholds the change-tracking contract: field changes,
//! `updated_at`, `version + 1` and `dirty = 1` land in the same atomic
//! statement or transaction, and nothing in this module touches the
//! network. Permanent deletes are the one exception to dirty-marking:
//! they drop the row and queue a delete tombstone instead.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, ToSql};

use crate::error::{Error, Result};
use crate::models::{FolderId, Note, NoteChanges, NoteDraft, NoteId, UserId};
use crate::remote::{RemoteNote, UpsertAck};

use super::Database;

const NOTE_COLUMNS: &str = "id, user_id, folder_id, title, content, is_favorite, is_deleted, \
                            created_at, updated_at, deleted_at, remote_id, version, dirty";

/// Outcome of applying one remote record to the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteApply {
    /// No local row had this remote id; a clean local copy was inserted
    Inserted,
    /// The remote copy was newer than a clean local row and replaced it
    Updated,
    /// The local row has unpushed edits; the remote copy was ignored
    SkippedDirty,
    /// The remote copy was not newer than the local row
    SkippedStale,
}

/// Trait for note storage operations
pub trait NoteRepository {
    /// Create a new note (version 1, dirty)
    fn create(&self, user_id: UserId, draft: NoteDraft) -> Result<Note>;

    /// Get a note by ID, deleted or not
    fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// List active notes, most recently updated first
    fn list(&self, user_id: UserId) -> Result<Vec<Note>>;

    /// List soft-deleted notes (the recycle bin)
    fn list_deleted(&self, user_id: UserId) -> Result<Vec<Note>>;

    /// List favorite notes, most recently updated first
    fn list_favorites(&self, user_id: UserId, limit: usize) -> Result<Vec<Note>>;

    /// Apply a partial update to an active note
    fn update(&self, id: &NoteId, changes: NoteChanges) -> Result<Note>;

    /// Pin or unpin a note on the favorites list
    fn set_favorite(&self, id: &NoteId, favorite: bool) -> Result<Note>;

    /// Move a note to the recycle bin
    fn soft_delete(&self, id: &NoteId) -> Result<()>;

    /// Bring a note back from the recycle bin
    fn restore(&self, id: &NoteId) -> Result<()>;

    /// Remove a note for good; queues a delete tombstone when the note
    /// was ever pushed
    fn delete_permanent(&self, id: &NoteId) -> Result<()>;

    /// Notes with unpushed changes, oldest update first
    fn list_dirty(&self, user_id: UserId) -> Result<Vec<Note>>;

    /// Reconcile one server-origin record into the local store
    fn upsert_from_remote(&self, user_id: UserId, remote: &RemoteNote) -> Result<RemoteApply>;

    /// Record a server push acknowledgement: clears dirty and stores the
    /// echoed id/version/timestamp, but only while the local version still
    /// matches `expected_version`. Returns whether the ack was applied.
    fn mark_pushed(&self, id: &NoteId, expected_version: i64, ack: &UpsertAck) -> Result<bool>;
}

/// `SQLite` implementation of `NoteRepository`
pub struct SqliteNoteRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteNoteRepository<'a> {
    /// Create a new repository over the given database
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Parse a note from a database row
    fn parse_note(row: &Row<'_>) -> rusqlite::Result<Note> {
        let id: String = row.get(0)?;
        let folder_id: Option<i64> = row.get(2)?;
        Ok(Note {
            id: id.parse().unwrap_or_default(),
            user_id: UserId(row.get(1)?),
            folder_id: folder_id.map(FolderId),
            title: row.get(3)?,
            content: row.get(4)?,
            is_favorite: row.get::<_, i64>(5)? != 0,
            is_deleted: row.get::<_, i64>(6)? != 0,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            deleted_at: row.get(9)?,
            remote_id: row.get(10)?,
            version: row.get(11)?,
            dirty: row.get::<_, i64>(12)? != 0,
        })
    }

    fn select_where(&self, clause: &str, params: &[&dyn ToSql]) -> Result<Vec<Note>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes {clause}"))?;
        let notes = stmt
            .query_map(params, Self::parse_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create(&self, user_id: UserId, draft: NoteDraft) -> Result<Note> {
        let note = Note::new(user_id, draft);

        self.db.lock().execute(
            &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                note.id.as_str(),
                note.user_id.as_i64(),
                note.folder_id.map(FolderId::as_i64),
                note.title,
                note.content,
                i64::from(note.is_favorite),
                i64::from(note.is_deleted),
                note.created_at,
                note.updated_at,
                note.deleted_at,
                note.remote_id,
                note.version,
                i64::from(note.dirty),
            ],
        )?;

        Ok(note)
    }

    fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let conn = self.db.lock();
        let result = conn.query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
            params![id.as_str()],
            Self::parse_note,
        );

        match result {
            Ok(note) => Ok(Some(note)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, user_id: UserId) -> Result<Vec<Note>> {
        self.select_where(
            "WHERE user_id = ? AND is_deleted = 0 ORDER BY updated_at DESC",
            &[&user_id.as_i64()],
        )
    }

    fn list_deleted(&self, user_id: UserId) -> Result<Vec<Note>> {
        self.select_where(
            "WHERE user_id = ? AND is_deleted = 1 ORDER BY deleted_at DESC, updated_at DESC",
            &[&user_id.as_i64()],
        )
    }

    fn list_favorites(&self, user_id: UserId, limit: usize) -> Result<Vec<Note>> {
        self.select_where(
            "WHERE user_id = ? AND is_deleted = 0 AND is_favorite = 1
             ORDER BY updated_at DESC LIMIT ?",
            &[&user_id.as_i64(), &(limit as i64)],
        )
    }

    fn update(&self, id: &NoteId, changes: NoteChanges) -> Result<Note> {
        if changes.is_empty() {
            return self.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()));
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(title) = changes.title {
            sets.push("title = ?");
            values.push(Box::new(title));
        }
        if let Some(content) = changes.content {
            sets.push("content = ?");
            values.push(Box::new(content));
        }
        if let Some(folder_id) = changes.folder_id {
            sets.push("folder_id = ?");
            values.push(Box::new(folder_id.map(FolderId::as_i64)));
        }
        if let Some(favorite) = changes.is_favorite {
            sets.push("is_favorite = ?");
            values.push(Box::new(i64::from(favorite)));
        }

        sets.push("updated_at = ?");
        values.push(Box::new(Utc::now()));
        sets.push("version = version + 1");
        sets.push("dirty = 1");

        values.push(Box::new(id.as_str()));
        let sql = format!(
            "UPDATE notes SET {} WHERE id = ? AND is_deleted = 0",
            sets.join(", ")
        );

        let rows = self.db.lock().execute(
            &sql,
            rusqlite::params_from_iter(values.iter().map(|value| value.as_ref())),
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn set_favorite(&self, id: &NoteId, favorite: bool) -> Result<Note> {
        self.update(
            id,
            NoteChanges {
                is_favorite: Some(favorite),
                ..NoteChanges::default()
            },
        )
    }

    fn soft_delete(&self, id: &NoteId) -> Result<()> {
        let now = Utc::now();
        let rows = self.db.lock().execute(
            "UPDATE notes SET is_deleted = 1, deleted_at = ?1, updated_at = ?1,
                    version = version + 1, dirty = 1
             WHERE id = ?2 AND is_deleted = 0",
            params![now, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn restore(&self, id: &NoteId) -> Result<()> {
        let rows = self.db.lock().execute(
            "UPDATE notes SET is_deleted = 0, deleted_at = NULL, updated_at = ?,
                    version = version + 1, dirty = 1
             WHERE id = ? AND is_deleted = 1",
            params![Utc::now(), id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn delete_permanent(&self, id: &NoteId) -> Result<()> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let row: Option<(i64, Option<String>)> = tx
            .query_row(
                "SELECT user_id, remote_id FROM notes WHERE id = ?",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((user_id, remote_id)) = row else {
            return Err(Error::NotFound(id.to_string()));
        };

        tx.execute("DELETE FROM notes WHERE id = ?", params![id.as_str()])?;

        // A note the server never saw has nothing to tombstone.
        if let Some(remote_id) = remote_id {
            tx.execute(
                "INSERT INTO sync_queue (user_id, note_local_id, remote_id, created_at)
                 VALUES (?, ?, ?, ?)",
                params![user_id, id.as_str(), remote_id, Utc::now()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_dirty(&self, user_id: UserId) -> Result<Vec<Note>> {
        self.select_where(
            "WHERE user_id = ? AND dirty = 1 ORDER BY updated_at ASC",
            &[&user_id.as_i64()],
        )
    }

    fn upsert_from_remote(&self, user_id: UserId, remote: &RemoteNote) -> Result<RemoteApply> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let local: Option<(String, bool, DateTime<Utc>)> = tx
            .query_row(
                "SELECT id, dirty, updated_at FROM notes WHERE user_id = ? AND remote_id = ?",
                params![user_id.as_i64(), remote.remote_id],
                |row| Ok((row.get(0)?, row.get::<_, i64>(1)? != 0, row.get(2)?)),
            )
            .optional()?;

        // Folder ids are local to each device; only keep a reference we
        // actually know, otherwise the insert would trip the FK.
        let folder_id: Option<i64> = match remote.folder_id {
            Some(folder_id) => tx
                .query_row(
                    "SELECT id FROM folders WHERE id = ?",
                    params![folder_id],
                    |row| row.get(0),
                )
                .optional()?,
            None => None,
        };

        let deleted_at = remote.is_deleted.then_some(remote.updated_at);

        let apply = match local {
            None => {
                let id = NoteId::new();
                tx.execute(
                    &format!(
                        "INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)"
                    ),
                    params![
                        id.as_str(),
                        user_id.as_i64(),
                        folder_id,
                        remote.title,
                        remote.content,
                        i64::from(remote.is_favorite),
                        i64::from(remote.is_deleted),
                        remote.updated_at,
                        remote.updated_at,
                        deleted_at,
                        remote.remote_id,
                        remote.version,
                    ],
                )?;
                RemoteApply::Inserted
            }
            Some((_, true, _)) => RemoteApply::SkippedDirty,
            Some((local_id, false, local_updated)) if remote.updated_at > local_updated => {
                tx.execute(
                    "UPDATE notes SET title = ?, content = ?, folder_id = ?, is_favorite = ?,
                            is_deleted = ?, deleted_at = ?, updated_at = ?, version = ?, dirty = 0
                     WHERE id = ?",
                    params![
                        remote.title,
                        remote.content,
                        folder_id,
                        i64::from(remote.is_favorite),
                        i64::from(remote.is_deleted),
                        deleted_at,
                        remote.updated_at,
                        remote.version,
                        local_id,
                    ],
                )?;
                RemoteApply::Updated
            }
            Some(_) => RemoteApply::SkippedStale,
        };

        tx.commit()?;
        Ok(apply)
    }

    fn mark_pushed(&self, id: &NoteId, expected_version: i64, ack: &UpsertAck) -> Result<bool> {
        let rows = self.db.lock().execute(
            "UPDATE notes SET dirty = 0, remote_id = ?, version = ?, updated_at = ?
             WHERE id = ? AND version = ?",
            params![
                ack.id,
                ack.version,
                ack.updated_at,
                id.as_str(),
                expected_version
            ],
        )?;

        Ok(rows > 0)
    }
}
