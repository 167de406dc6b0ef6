//! Remote note-collection client
//!
//! Everything the sync engine knows about the server lives behind the
//! [`RemoteClient`] trait; the wire types here normalize the server's
//! looser shapes (numeric-or-string ids, 0/1 flags, bare-array-or-envelope
//! list responses) into one canonical form at the boundary.

mod http;

pub use http::HttpRemoteClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::models::{FolderId, Note, UserId};

/// A note as served by the remote collection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteNote {
    #[serde(deserialize_with = "de_id")]
    pub remote_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_favorite: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_deleted: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: i64,
}

/// Normalized result of a list-changed-since call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangedSince {
    pub items: Vec<RemoteNote>,
    /// Server clock at response time, when the server supplies it; takes
    /// precedence over the per-item maximum as the next watermark
    pub server_now: Option<DateTime<Utc>>,
}

/// Body of an upsert request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertPayload {
    /// The note's remote id, or `None` to ask the server to create one
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub folder_id: Option<i64>,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl From<&Note> for UpsertPayload {
    fn from(note: &Note) -> Self {
        Self {
            id: note.remote_id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            folder_id: note.folder_id.map(FolderId::as_i64),
            is_favorite: note.is_favorite,
            is_deleted: note.is_deleted,
            updated_at: note.updated_at,
            version: note.version,
        }
    }
}

/// Server acknowledgement of an upsert; authoritative for all three fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpsertAck {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Authenticated interface to the server's note collection
///
/// Contract notes: every request carries the per-user identity header;
/// requests have a bounded timeout surfacing as [`crate::Error::Timeout`];
/// timestamps travel as RFC 3339 UTC, which the server filters on
/// lexicographically, so both clocks must stick to that format.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch notes changed since `since`; `None` means everything
    async fn list_changed_since(
        &self,
        user_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<ChangedSince>;

    /// Create or update a note; `payload.id == None` requests a create
    async fn upsert_note(&self, user_id: UserId, payload: &UpsertPayload) -> Result<UpsertAck>;

    /// Delete a note; a server-side "already gone" is success
    async fn delete_note(&self, user_id: UserId, remote_id: &str) -> Result<()>;
}

/// The two shapes the list endpoint may answer with
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse {
    Envelope {
        items: Vec<RemoteNote>,
        #[serde(default)]
        server_now: Option<DateTime<Utc>>,
    },
    Bare(Vec<RemoteNote>),
}

impl From<ListResponse> for ChangedSince {
    fn from(response: ListResponse) -> Self {
        match response {
            ListResponse::Envelope { items, server_now } => Self { items, server_now },
            ListResponse::Bare(items) => Self {
                items,
                server_now: None,
            },
        }
    }
}

/// The server hands out integer ids; older payloads used strings.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// SQLite-backed servers emit 0/1 where JSON has booleans.
fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => flag,
        Flag::Number(number) => number != 0,
    })
}

const fn default_version() -> i64 {
    1
}
