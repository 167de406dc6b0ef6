//! Folder repository implementation

use chrono::Utc;
use rusqlite::{params, Row};

use crate::error::{Error, Result};
use crate::models::{Folder, FolderId, UserId};

use super::Database;

/// Trait for folder storage operations
pub trait FolderRepository {
    /// Create a folder; names are unique per user
    fn create(&self, user_id: UserId, name: &str) -> Result<Folder>;

    /// List a user's folders by name
    fn list(&self, user_id: UserId) -> Result<Vec<Folder>>;

    /// Delete a folder; contained notes are detached, not deleted
    fn delete(&self, id: FolderId) -> Result<()>;
}

/// `SQLite` implementation of `FolderRepository`
pub struct SqliteFolderRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteFolderRepository<'a> {
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn parse_folder(row: &Row<'_>) -> rusqlite::Result<Folder> {
        Ok(Folder {
            id: FolderId(row.get(0)?),
            user_id: UserId(row.get(1)?),
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl FolderRepository for SqliteFolderRepository<'_> {
    fn create(&self, user_id: UserId, name: &str) -> Result<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("folder name must not be empty".into()));
        }

        let created_at = Utc::now();
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO folders (user_id, name, created_at) VALUES (?, ?, ?)",
            params![user_id.as_i64(), name, created_at],
        )?;

        Ok(Folder {
            id: FolderId(conn.last_insert_rowid()),
            user_id,
            name: name.to_string(),
            created_at,
            updated_at: None,
        })
    }

    fn list(&self, user_id: UserId) -> Result<Vec<Folder>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, created_at, updated_at
             FROM folders WHERE user_id = ? ORDER BY name ASC",
        )?;

        let folders = stmt
            .query_map(params![user_id.as_i64()], Self::parse_folder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(folders)
    }

    fn delete(&self, id: FolderId) -> Result<()> {
        let rows = self
            .db
            .lock()
            .execute("DELETE FROM folders WHERE id = ?", params![id.as_i64()])?;

        if rows == 0 {
            return Err(Error::NotFound(format!("folder {id}")));
        }

        Ok(())
    }
}
