//! memo-core - Core library for Memo
//!
//! This crate contains the shared models, the local SQLite store with its
//! change-tracking contract, the remote client, and the offline/online
//! sync engine used by every Memo interface.

pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, NoteId, UserId};
