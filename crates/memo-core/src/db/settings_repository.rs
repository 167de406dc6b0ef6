//! Sync settings repository
//!
//! Per-user key-value storage for the pieces of sync state that survive
//! restarts: the pull watermark and the auto-sync toggle. Keys embed the
//! user id so switching accounts (or guest mode) never cross-contaminates.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::models::UserId;
use crate::util::{format_timestamp, parse_timestamp};

use super::Database;

/// Trait for persisted sync-state operations
pub trait SyncSettingsRepository {
    /// The `updated_after` boundary for the next pull; `None` means a
    /// full pull has never completed
    fn watermark(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>>;

    /// Move the watermark forward; a candidate older than the stored value
    /// is ignored so the watermark never regresses. Returns what is stored
    /// afterwards.
    fn advance_watermark(&self, user_id: UserId, candidate: DateTime<Utc>)
        -> Result<DateTime<Utc>>;

    /// Whether background sync (periodic and realtime-triggered) runs
    fn auto_sync_enabled(&self, user_id: UserId) -> Result<bool>;

    /// Toggle background sync
    fn set_auto_sync_enabled(&self, user_id: UserId, enabled: bool) -> Result<()>;
}

/// `SQLite` implementation of `SyncSettingsRepository`
pub struct SqliteSyncSettingsRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteSyncSettingsRepository<'a> {
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .lock()
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.db.lock().execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn watermark_key(user_id: UserId) -> String {
    format!("sync.last.{user_id}")
}

fn auto_sync_key(user_id: UserId) -> String {
    format!("sync.auto.{user_id}")
}

impl SyncSettingsRepository for SqliteSyncSettingsRepository<'_> {
    fn watermark(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.get_setting(&watermark_key(user_id))? else {
            return Ok(None);
        };

        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            tracing::warn!(%raw, "stored watermark is unreadable; forcing a full pull");
        }
        Ok(parsed)
    }

    fn advance_watermark(
        &self,
        user_id: UserId,
        candidate: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let next = self
            .watermark(user_id)?
            .map_or(candidate, |current| current.max(candidate));
        self.set_setting(&watermark_key(user_id), &format_timestamp(next))?;
        Ok(next)
    }

    fn auto_sync_enabled(&self, user_id: UserId) -> Result<bool> {
        // Background sync is on until the user turns it off.
        let enabled = self
            .get_setting(&auto_sync_key(user_id))?
            .is_none_or(|value| value == "true");
        Ok(enabled)
    }

    fn set_auto_sync_enabled(&self, user_id: UserId, enabled: bool) -> Result<()> {
        self.set_setting(&auto_sync_key(user_id), if enabled { "true" } else { "false" })
    }
}
