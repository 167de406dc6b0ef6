//! Realtime change-notification contract
//!
//! A realtime transport (socket, long-poll, whatever the app wires up) is
//! an external collaborator; the engine only consumes these events, and
//! only as a "something changed remotely, a sync is worth running" signal.
//! The payload fields are informational, used for logging.

/// What the server says happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEventKind {
    Created,
    Updated,
    Deleted,
}

impl NoteEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// One remote change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub kind: NoteEventKind,
    /// Remote id of the changed note, when the transport knows it
    pub remote_id: Option<String>,
}

impl NoteEvent {
    #[must_use]
    pub const fn new(kind: NoteEventKind, remote_id: Option<String>) -> Self {
        Self { kind, remote_id }
    }
}
