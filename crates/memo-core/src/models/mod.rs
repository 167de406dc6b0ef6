//! Data models for Memo

mod asset;
mod folder;
mod note;
mod tombstone;
mod user;

pub use asset::{AssetKind, NoteAsset};
pub use folder::{Folder, FolderId};
pub use note::{Note, NoteChanges, NoteDraft, NoteId};
pub use tombstone::DeleteTombstone;
pub use user::{User, UserId};
