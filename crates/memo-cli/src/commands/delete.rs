use memo_core::db::{NoteRepository, SqliteNoteRepository};

use crate::error::CliError;

use super::common::find_note;
use super::CommandContext;

pub fn run_delete(ctx: &CommandContext, id: &str) -> Result<(), CliError> {
    let note = find_note(&ctx.db, ctx.user_id, id)?;
    SqliteNoteRepository::new(&ctx.db).soft_delete(&note.id)?;
    println!("Moved '{}' to the recycle bin", note.title);
    Ok(())
}

pub fn run_restore(ctx: &CommandContext, id: &str) -> Result<(), CliError> {
    let note = find_note(&ctx.db, ctx.user_id, id)?;
    SqliteNoteRepository::new(&ctx.db).restore(&note.id)?;
    println!("Restored '{}'", note.title);
    Ok(())
}

pub fn run_purge(ctx: &CommandContext, id: &str) -> Result<(), CliError> {
    let note = find_note(&ctx.db, ctx.user_id, id)?;
    SqliteNoteRepository::new(&ctx.db).delete_permanent(&note.id)?;

    if note.remote_id.is_some() {
        println!("Deleted '{}'; the server copy goes on the next sync", note.title);
    } else {
        println!("Deleted '{}'", note.title);
    }
    Ok(())
}
