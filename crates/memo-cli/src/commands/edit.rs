use memo_core::db::{NoteRepository, SqliteNoteRepository};
use memo_core::models::{FolderId, NoteChanges};

use crate::error::CliError;

use super::common::find_note;
use super::CommandContext;

pub fn run_edit(
    ctx: &CommandContext,
    id: &str,
    title: Option<String>,
    content: Option<String>,
    folder: Option<i64>,
    no_folder: bool,
) -> Result<(), CliError> {
    let note = find_note(&ctx.db, ctx.user_id, id)?;

    let folder_id = if no_folder {
        Some(None)
    } else {
        folder.map(|id| Some(FolderId::from(id)))
    };

    let changes = NoteChanges {
        title,
        content,
        folder_id,
        is_favorite: None,
    };
    if changes.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    let updated = SqliteNoteRepository::new(&ctx.db).update(&note.id, changes)?;
    println!("Updated note ({}, v{})", updated.title, updated.version);
    Ok(())
}

pub fn run_favorite(ctx: &CommandContext, id: &str, remove: bool) -> Result<(), CliError> {
    let note = find_note(&ctx.db, ctx.user_id, id)?;
    let updated = SqliteNoteRepository::new(&ctx.db).set_favorite(&note.id, !remove)?;

    if updated.is_favorite {
        println!("Pinned '{}' to favorites", updated.title);
    } else {
        println!("Unpinned '{}'", updated.title);
    }
    Ok(())
}
