//! Delete tombstone model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NoteId, UserId};

/// A queued record of a permanent delete that must still reach the server.
///
/// Tombstones exist only for notes that had a `remote_id`; a note that was
/// never pushed is simply dropped locally. The queue entry survives until
/// the remote delete succeeds (a 404 counts as success).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTombstone {
    /// Queue row identifier
    pub id: i64,
    /// Owning user
    pub user_id: UserId,
    /// Local id of the deleted note, kept for diagnostics
    pub note_local_id: Option<NoteId>,
    /// Server-side id to delete
    pub remote_id: String,
    /// Failed delivery attempts so far
    pub try_count: i64,
    /// Most recent delivery error, truncated for storage
    pub last_error: Option<String>,
    /// When the delete was queued
    pub created_at: DateTime<Utc>,
}
