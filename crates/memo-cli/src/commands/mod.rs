//! Command implementations

pub mod add;
pub mod common;
pub mod delete;
pub mod edit;
pub mod folder;
pub mod list;
pub mod sync;

use std::sync::Arc;

use memo_core::db::Database;
use memo_core::UserId;

/// Everything a command needs: the opened database and the acting user.
pub struct CommandContext {
    pub db: Arc<Database>,
    pub user_id: UserId,
}
