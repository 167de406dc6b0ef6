//! Offline/online synchronization: the reconciliation engine plus the
//! scheduling around it

mod coordinator;
mod debounce;
mod engine;
mod events;

pub use coordinator::{SyncCoordinator, DEFAULT_DEBOUNCE_WINDOW, DEFAULT_SYNC_INTERVAL};
pub use debounce::Debouncer;
pub use engine::{SyncEngine, SyncOutcome};
pub use events::{NoteEvent, NoteEventKind};
