//! Note attachment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NoteId;

/// Kind of attachment stored alongside a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
}

impl AssetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
        }
    }
}

/// A file attached to a note; the path is relative to the app's data
/// directory. Assets are local-only and die with their note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAsset {
    pub id: i64,
    pub note_id: NoteId,
    pub kind: AssetKind,
    pub path: String,
    pub created_at: DateTime<Utc>,
}
