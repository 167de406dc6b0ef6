use memo_core::db::{FolderRepository, SqliteFolderRepository};
use memo_core::models::FolderId;

use crate::error::CliError;

use super::CommandContext;

pub fn run_folder_new(ctx: &CommandContext, name: &str) -> Result<(), CliError> {
    let folder = SqliteFolderRepository::new(&ctx.db).create(ctx.user_id, name)?;
    println!("Created folder {} ({})", folder.id, folder.name);
    Ok(())
}

pub fn run_folder_list(ctx: &CommandContext) -> Result<(), CliError> {
    let folders = SqliteFolderRepository::new(&ctx.db).list(ctx.user_id)?;

    if folders.is_empty() {
        println!("No folders.");
        return Ok(());
    }

    for folder in &folders {
        println!("{:>4}  {}", folder.id.as_i64(), folder.name);
    }
    Ok(())
}

pub fn run_folder_delete(ctx: &CommandContext, id: i64) -> Result<(), CliError> {
    SqliteFolderRepository::new(&ctx.db).delete(FolderId::from(id))?;
    println!("Deleted folder {id}; its notes were detached");
    Ok(())
}
