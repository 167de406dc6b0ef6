//! Memo CLI - local-first notes from the terminal
//!
//! All the interesting machinery lives in memo-core; this binary is the
//! thin collaborator that opens the store, resolves the acting user, and
//! calls in.

mod cli;
mod commands;
mod error;

use clap::Parser;

use cli::{AutosyncCommands, Cli, Commands, FolderCommands};
use commands::common::{open_database, resolve_db_path, resolve_server, resolve_user};
use commands::CommandContext;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("memo_core=info".parse().expect("valid directive"))
                .add_directive("memo_cli=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let server = resolve_server(cli.server);
    let ctx = CommandContext {
        db: open_database(&db_path)?,
        user_id: resolve_user(cli.user),
    };

    match cli.command {
        Commands::Add {
            title,
            content,
            folder,
        } => commands::add::run_add(&ctx, &title, &content, folder)?,
        Commands::List {
            deleted,
            favorites,
            limit,
            json,
        } => commands::list::run_list(&ctx, deleted, favorites, limit, json)?,
        Commands::Edit {
            id,
            title,
            content,
            folder,
            no_folder,
        } => commands::edit::run_edit(&ctx, &id, title, content, folder, no_folder)?,
        Commands::Favorite { id, remove } => commands::edit::run_favorite(&ctx, &id, remove)?,
        Commands::Delete { id } => commands::delete::run_delete(&ctx, &id)?,
        Commands::Restore { id } => commands::delete::run_restore(&ctx, &id)?,
        Commands::Purge { id } => commands::delete::run_purge(&ctx, &id)?,
        Commands::Folder { command } => match command {
            FolderCommands::New { name } => commands::folder::run_folder_new(&ctx, &name)?,
            FolderCommands::List => commands::folder::run_folder_list(&ctx)?,
            FolderCommands::Delete { id } => commands::folder::run_folder_delete(&ctx, id)?,
        },
        Commands::Sync => commands::sync::run_sync(&ctx, &server).await?,
        Commands::Autosync { command } => match command {
            AutosyncCommands::On => commands::sync::run_autosync_on(&ctx)?,
            AutosyncCommands::Off => commands::sync::run_autosync_off(&ctx)?,
            AutosyncCommands::Status => commands::sync::run_autosync_status(&ctx)?,
        },
        Commands::Watch { interval } => commands::sync::run_watch(&ctx, &server, interval).await?,
    }

    Ok(())
}
