//! User repository implementation
//!
//! Users are created and authenticated server-side; locally we only
//! mirror the identities that have signed in on this device, plus the
//! pre-seeded guest row.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::models::{User, UserId};

use super::Database;

/// Trait for local user storage operations
pub trait UserRepository {
    /// Look up a locally known user
    fn get(&self, id: UserId) -> Result<Option<User>>;

    /// Store or refresh a server-provided identity
    fn upsert(&self, id: UserId, username: &str, email: Option<&str>) -> Result<User>;
}

/// `SQLite` implementation of `UserRepository`
pub struct SqliteUserRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteUserRepository<'a> {
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn parse_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: UserId(row.get(0)?),
            username: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn get(&self, id: UserId) -> Result<Option<User>> {
        let user = self
            .db
            .lock()
            .query_row(
                "SELECT id, username, email, created_at FROM users WHERE id = ?",
                params![id.as_i64()],
                Self::parse_user,
            )
            .optional()?;
        Ok(user)
    }

    fn upsert(&self, id: UserId, username: &str, email: Option<&str>) -> Result<User> {
        self.db.lock().execute(
            "INSERT INTO users (id, username, email, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET username = excluded.username, email = excluded.email",
            params![id.as_i64(), username, email, Utc::now()],
        )?;

        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }
}
