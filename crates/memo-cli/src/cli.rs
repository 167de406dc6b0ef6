use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "memo")]
#[command(about = "Local-first notes with reliable background sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Sync server base URL (e.g. http://localhost:5000/api)
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Numeric user id; defaults to the guest identity
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<i64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        title: String,
        /// Note body
        #[arg(short, long, default_value = "")]
        content: String,
        /// Folder to file the note under
        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
    },
    /// List notes
    List {
        /// Show the recycle bin instead of active notes
        #[arg(long)]
        deleted: bool,
        /// Only favorites
        #[arg(long, conflicts_with = "deleted")]
        favorites: bool,
        /// Number of notes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New body
        #[arg(long)]
        content: Option<String>,
        /// Move into a folder
        #[arg(long, value_name = "ID", conflicts_with = "no_folder")]
        folder: Option<i64>,
        /// Detach from its folder
        #[arg(long)]
        no_folder: bool,
    },
    /// Pin or unpin a note on the favorites list
    Favorite {
        /// Note ID or unique ID prefix
        id: String,
        /// Unpin instead
        #[arg(long)]
        remove: bool,
    },
    /// Move a note to the recycle bin
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Bring a note back from the recycle bin
    Restore {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Remove a note permanently
    Purge {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Manage folders
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Run one sync cycle against the server
    Sync,
    /// Control background sync
    Autosync {
        #[command(subcommand)]
        command: AutosyncCommands,
    },
    /// Keep syncing periodically until interrupted
    Watch {
        /// Override the sync period in seconds
        #[arg(long, value_name = "SECONDS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum FolderCommands {
    /// Create a folder
    New {
        /// Folder name
        name: String,
    },
    /// List folders
    List,
    /// Delete a folder; notes inside are detached, not deleted
    Delete {
        /// Folder id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum AutosyncCommands {
    /// Enable periodic and realtime-triggered sync
    On,
    /// Disable background sync
    Off,
    /// Show the current setting
    Status,
}
