use memo_core::db::{NoteRepository, SqliteNoteRepository};
use memo_core::models::{FolderId, NoteDraft};

use crate::error::CliError;

use super::CommandContext;

pub fn run_add(
    ctx: &CommandContext,
    title: &str,
    content: &str,
    folder: Option<i64>,
) -> Result<(), CliError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }

    let mut draft = NoteDraft::new(title, content);
    if let Some(folder) = folder {
        draft = draft.in_folder(FolderId::from(folder));
    }

    let note = SqliteNoteRepository::new(&ctx.db).create(ctx.user_id, draft)?;
    let short_id: String = note.id.as_str().chars().take(8).collect();
    println!("Created note {short_id} ({})", note.title);
    Ok(())
}
