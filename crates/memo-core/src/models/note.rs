//! Note model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FolderId, UserId};

/// A unique identifier for a note, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A note in the local store
///
/// `version`, `dirty` and `remote_id` are the change-tracking fields the
/// sync engine lives on: every local mutation bumps `version` and sets
/// `dirty`; a server-acknowledged push clears `dirty` and pins
/// `remote_id`/`version`/`updated_at` to what the server echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique local identifier
    pub id: NoteId,
    /// Owning user
    pub user_id: UserId,
    /// Containing folder, if any
    pub folder_id: Option<FolderId>,
    /// Note title
    pub title: String,
    /// Note body
    pub content: String,
    /// Pinned to the favorites list
    pub is_favorite: bool,
    /// Soft-deleted (recycle bin); the row survives for sync
    pub is_deleted: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp (local clock locally, server clock for
    /// server-origin updates)
    pub updated_at: DateTime<Utc>,
    /// When the note entered the recycle bin
    pub deleted_at: Option<DateTime<Utc>>,
    /// Server-assigned identifier; set by the first successful push and
    /// never changed afterwards
    pub remote_id: Option<String>,
    /// Monotonic mutation counter, starts at 1
    pub version: i64,
    /// Local changes not yet acknowledged by the server
    pub dirty: bool,
}

impl Note {
    /// Create a new note owned by `user_id`
    ///
    /// New notes start at version 1 and dirty, so the next sync cycle
    /// pushes them.
    #[must_use]
    pub fn new(user_id: UserId, draft: NoteDraft) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::new(),
            user_id,
            folder_id: draft.folder_id,
            title: draft.title,
            content: draft.content,
            is_favorite: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            remote_id: None,
            version: 1,
            dirty: true,
        }
    }

    /// Whether the note has ever been accepted by the server
    #[must_use]
    pub const fn is_pushed(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Input for creating a note
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub folder_id: Option<FolderId>,
}

impl NoteDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            folder_id: None,
        }
    }

    #[must_use]
    pub const fn in_folder(mut self, folder_id: FolderId) -> Self {
        self.folder_id = Some(folder_id);
        self
    }
}

/// Partial update of a note's user-editable fields
///
/// `folder_id` is doubly optional: `None` leaves the folder alone,
/// `Some(None)` detaches the note from its folder.
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder_id: Option<Option<FolderId>>,
    pub is_favorite: Option<bool>,
}

impl NoteChanges {
    /// True when no field would change
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.folder_id.is_none()
            && self.is_favorite.is_none()
    }
}
