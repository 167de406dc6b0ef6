//! Note attachment repository implementation

use chrono::Utc;
use rusqlite::{params, Row};

use crate::error::{Error, Result};
use crate::models::{AssetKind, NoteAsset, NoteId};

use super::Database;

/// Trait for attachment metadata operations
///
/// Only the metadata lives here; file bytes are the caller's problem.
pub trait AssetRepository {
    /// Record an attachment for a note
    fn add(&self, note_id: &NoteId, kind: AssetKind, path: &str) -> Result<NoteAsset>;

    /// Attachments for a note, oldest first
    fn list(&self, note_id: &NoteId) -> Result<Vec<NoteAsset>>;

    /// Drop an attachment record
    fn remove(&self, id: i64) -> Result<()>;
}

/// `SQLite` implementation of `AssetRepository`
pub struct SqliteAssetRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteAssetRepository<'a> {
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn parse_asset(row: &Row<'_>) -> rusqlite::Result<NoteAsset> {
        let note_id: String = row.get(1)?;
        // Images are the only kind stored today.
        let _kind: String = row.get(2)?;
        Ok(NoteAsset {
            id: row.get(0)?,
            note_id: note_id.parse().unwrap_or_default(),
            kind: AssetKind::Image,
            path: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl AssetRepository for SqliteAssetRepository<'_> {
    fn add(&self, note_id: &NoteId, kind: AssetKind, path: &str) -> Result<NoteAsset> {
        let created_at = Utc::now();
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO note_assets (note_id, kind, path, created_at) VALUES (?, ?, ?, ?)",
            params![note_id.as_str(), kind.as_str(), path, created_at],
        )?;

        Ok(NoteAsset {
            id: conn.last_insert_rowid(),
            note_id: *note_id,
            kind,
            path: path.to_string(),
            created_at,
        })
    }

    fn list(&self, note_id: &NoteId) -> Result<Vec<NoteAsset>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, note_id, kind, path, created_at
             FROM note_assets WHERE note_id = ? ORDER BY created_at ASC",
        )?;

        let assets = stmt
            .query_map(params![note_id.as_str()], Self::parse_asset)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(assets)
    }

    fn remove(&self, id: i64) -> Result<()> {
        let rows = self
            .db
            .lock()
            .execute("DELETE FROM note_assets WHERE id = ?", params![id])?;

        if rows == 0 {
            return Err(Error::NotFound(format!("asset {id}")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NoteRepository, SqliteNoteRepository};
    use crate::models::{NoteDraft, UserId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_and_list() {
        let db = Database::open_in_memory().unwrap();
        let notes = SqliteNoteRepository::new(&db);
        let assets = SqliteAssetRepository::new(&db);

        let note = notes
            .create(UserId::GUEST, NoteDraft::new("Trip", ""))
            .unwrap();
        assets
            .add(&note.id, AssetKind::Image, "attachments/trip/1.jpg")
            .unwrap();

        let listed = assets.list(&note.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "attachments/trip/1.jpg");
    }

    #[test]
    fn test_assets_die_with_their_note() {
        let db = Database::open_in_memory().unwrap();
        let notes = SqliteNoteRepository::new(&db);
        let assets = SqliteAssetRepository::new(&db);

        let note = notes
            .create(UserId::GUEST, NoteDraft::new("Trip", ""))
            .unwrap();
        assets
            .add(&note.id, AssetKind::Image, "attachments/trip/1.jpg")
            .unwrap();

        notes.delete_permanent(&note.id).unwrap();
        assert!(assets.list(&note.id).unwrap().is_empty());
    }
}
