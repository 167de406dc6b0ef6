//! Quiet-window debouncing for bursty triggers

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Coalesces bursts of triggers into a single deferred call.
///
/// Each [`call`](Self::call) arms a timer for the quiet window and disarms
/// any previously pending one, so N triggers inside the window run the
/// action exactly once, after the window elapses. Must be used from within
/// a Tokio runtime.
pub struct Debouncer {
    quiet: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `action` to run once the quiet window passes without
    /// another trigger.
    pub fn call<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let quiet = self.quiet;
        let task = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            action().await;
        });

        let mut pending = self.lock();
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Drop any pending trigger. Safe to call repeatedly, or when nothing
    /// is pending.
    pub fn cancel(&self) {
        if let Some(task) = self.lock().take() {
            task.abort();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
