//! Shared helpers for command implementations

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use memo_core::db::{Database, NoteRepository, SqliteNoteRepository};
use memo_core::models::Note;
use memo_core::UserId;
use serde::Serialize;

use crate::error::CliError;

/// Resolve the database location: flag, then `MEMO_DB`, then the
/// platform data directory.
pub fn resolve_db_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }
    if let Ok(path) = env::var("MEMO_DB") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("memo")
        .join("memo.db")
}

/// Resolve the sync server base URL: flag, then `MEMO_SERVER`, then the
/// development default.
pub fn resolve_server(cli_server: Option<String>) -> String {
    cli_server
        .or_else(|| env::var("MEMO_SERVER").ok().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "http://localhost:5000/api".to_string())
}

/// Resolve the acting user: flag, then `MEMO_USER`, then guest.
pub fn resolve_user(cli_user: Option<i64>) -> UserId {
    cli_user
        .or_else(|| env::var("MEMO_USER").ok().and_then(|v| v.parse().ok()))
        .map_or(UserId::GUEST, UserId::from)
}

/// Open (creating if needed) the database at the resolved path.
pub fn open_database(path: &Path) -> Result<Arc<Database>, CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::debug!(path = %path.display(), "opening database");
    Ok(Arc::new(Database::open(path)?))
}

/// Find a note by full id or unique id prefix, searching active notes and
/// the recycle bin.
pub fn find_note(db: &Database, user_id: UserId, id_or_prefix: &str) -> Result<Note, CliError> {
    let needle = id_or_prefix.trim();
    if needle.is_empty() {
        return Err(CliError::NoteNotFound(id_or_prefix.to_string()));
    }

    let repo = SqliteNoteRepository::new(db);
    if let Ok(id) = needle.parse() {
        if let Some(note) = repo.get(&id)? {
            return Ok(note);
        }
    }

    let mut candidates: Vec<Note> = repo
        .list(user_id)?
        .into_iter()
        .chain(repo.list_deleted(user_id)?)
        .filter(|note| note.id.as_str().starts_with(needle))
        .collect();

    match candidates.len() {
        0 => Err(CliError::NoteNotFound(needle.to_string())),
        1 => Ok(candidates.remove(0)),
        n => Err(CliError::AmbiguousNoteId(format!(
            "Id prefix '{needle}' matches {n} notes; use more characters"
        ))),
    }
}

/// One note as rendered by `list --json`
#[derive(Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub folder_id: Option<i64>,
    pub favorite: bool,
    pub deleted: bool,
    pub synced: bool,
    pub updated_at: String,
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.as_str(),
        title: note.title.clone(),
        folder_id: note.folder_id.map(memo_core::models::FolderId::as_i64),
        favorite: note.is_favorite,
        deleted: note.is_deleted,
        synced: !note.dirty,
        updated_at: note.updated_at.to_rfc3339(),
    }
}

/// Human-readable single line for a note
pub fn format_note_line(note: &Note) -> String {
    let short_id: String = note.id.as_str().chars().take(8).collect();
    let marker = match (note.is_favorite, note.dirty) {
        (true, true) => "*!",
        (true, false) => "* ",
        (false, true) => " !",
        (false, false) => "  ",
    };
    format!(
        "{short_id}  {marker} {:<40} {}",
        truncate_title(&note.title, 40),
        format_local(note.updated_at)
    )
}

fn truncate_title(title: &str, max: usize) -> String {
    if title.chars().count() <= max {
        title.to_string()
    } else {
        let mut out: String = title.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn format_local(value: DateTime<Utc>) -> String {
    value
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
