use memo_core::db::{NoteRepository, SqliteNoteRepository};

use crate::error::CliError;

use super::common::{format_note_line, note_to_list_item, NoteListItem};
use super::CommandContext;

pub fn run_list(
    ctx: &CommandContext,
    deleted: bool,
    favorites: bool,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let repo = SqliteNoteRepository::new(&ctx.db);

    let mut notes = if deleted {
        repo.list_deleted(ctx.user_id)?
    } else if favorites {
        repo.list_favorites(ctx.user_id, limit)?
    } else {
        repo.list(ctx.user_id)?
    };
    notes.truncate(limit);

    if as_json {
        let items = notes.iter().map(note_to_list_item).collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No notes.");
        return Ok(());
    }

    for note in &notes {
        println!("{}", format_note_line(note));
    }
    Ok(())
}
