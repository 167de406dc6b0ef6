//! Scheduling and mutual exclusion for sync cycles
//!
//! The coordinator owns every piece of scheduler state the engine must
//! not: the in-flight flag, the periodic task, the realtime listener and
//! its debounce timer. One instance lives for the duration of an app
//! session and is injected where needed; there are no globals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::{SqliteSyncSettingsRepository, SyncSettingsRepository};
use crate::error::Result;
use crate::models::UserId;
use crate::remote::RemoteClient;

use super::debounce::Debouncer;
use super::engine::{SyncEngine, SyncOutcome};
use super::events::NoteEvent;

/// Period of the background sync loop while auto-sync is enabled
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Quiet window that coalesces a burst of realtime notifications into a
/// single sync
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(800);

/// Decides when [`SyncEngine`] runs: on demand, on a fixed period, and in
/// response to realtime change notifications.
///
/// At most one cycle runs at a time; a call that finds one in flight
/// returns an all-zero [`SyncOutcome`] instead of blocking or erroring.
pub struct SyncCoordinator<C: RemoteClient + 'static> {
    inner: Arc<Inner<C>>,
    sync_interval: Duration,
    periodic: Mutex<Option<JoinHandle<()>>>,
    realtime: Mutex<Option<JoinHandle<()>>>,
}

/// State shared with the spawned scheduler tasks
struct Inner<C> {
    engine: SyncEngine<C>,
    user_id: UserId,
    busy: AtomicBool,
    debouncer: Debouncer,
}

impl<C: RemoteClient + 'static> SyncCoordinator<C> {
    pub fn new(engine: SyncEngine<C>, user_id: UserId) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                user_id,
                busy: AtomicBool::new(false),
                debouncer: Debouncer::new(DEFAULT_DEBOUNCE_WINDOW),
            }),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            periodic: Mutex::new(None),
            realtime: Mutex::new(None),
        }
    }

    /// Override the periodic interval; call before starting the loop
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Override the realtime debounce window; call before attaching a
    /// channel
    #[must_use]
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.debouncer = Debouncer::new(window);
        }
        self
    }

    /// Run a sync cycle now, unless one is already in flight.
    ///
    /// The busy no-op is a valid outcome, not an error: callers get all
    /// zero counts and the running cycle finishes undisturbed.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        self.inner.sync_now().await
    }

    /// Like [`sync_now`](Self::sync_now), but failures are only logged.
    /// This is what every automatic trigger uses.
    pub async fn sync_silent(&self) {
        self.inner.sync_silent().await;
    }

    /// Whether a cycle is currently executing
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Start the periodic background loop.
    ///
    /// The persisted auto-sync flag is re-read on every tick; the loop
    /// stops itself the moment it observes the flag cleared, so a toggle
    /// in settings needs no extra plumbing. Starting twice is a no-op
    /// while the previous loop is alive.
    pub fn start_periodic(&self) {
        let mut slot = lock(&self.periodic);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let interval = self.sync_interval;
        let inner = Arc::clone(&self.inner);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the loop should wait a
            // full interval before its first sync.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !inner.auto_sync_enabled() {
                    tracing::debug!("auto-sync disabled; periodic loop stopping");
                    break;
                }
                inner.sync_silent().await;
            }
        }));
    }

    /// Consume realtime change notifications from a transport.
    ///
    /// Bursts are debounced into a single cycle, gated by the same
    /// auto-sync flag as the periodic loop, and always silent. Attaching
    /// a new channel replaces a previous listener.
    pub fn attach_realtime(&self, mut events: UnboundedReceiver<NoteEvent>) {
        let mut slot = lock(&self.realtime);
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let inner = Arc::clone(&self.inner);
        *slot = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracing::debug!(
                    kind = event.kind.as_str(),
                    remote_id = event.remote_id.as_deref(),
                    "remote change notification"
                );
                let triggered = Arc::clone(&inner);
                inner.debouncer.call(move || async move {
                    if triggered.auto_sync_enabled() {
                        triggered.sync_silent().await;
                    }
                });
            }
            tracing::debug!("realtime channel closed");
        }));
    }

    /// Tear down both background tasks and any pending debounce.
    ///
    /// Idempotent; an in-flight cycle is not interrupted, but nothing new
    /// fires afterwards.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.periodic).take() {
            handle.abort();
        }
        if let Some(handle) = lock(&self.realtime).take() {
            handle.abort();
        }
        self.inner.debouncer.cancel();
    }
}

impl<C: RemoteClient + 'static> Drop for SyncCoordinator<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<C: RemoteClient + 'static> Inner<C> {
    async fn sync_now(&self) -> Result<SyncOutcome> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("sync cycle already in flight; skipping");
            return Ok(SyncOutcome::default());
        };

        self.engine.run_cycle(self.user_id).await
    }

    async fn sync_silent(&self) {
        match self.sync_now().await {
            Ok(outcome) => tracing::debug!(
                pushed = outcome.pushed,
                deleted = outcome.deleted,
                pulled = outcome.pulled,
                "background sync finished"
            ),
            Err(error) => tracing::warn!(%error, "background sync failed"),
        }
    }

    fn auto_sync_enabled(&self) -> bool {
        let settings = SqliteSyncSettingsRepository::new(self.engine.database());
        match settings.auto_sync_enabled(self.user_id) {
            Ok(enabled) => enabled,
            Err(error) => {
                tracing::warn!(%error, "could not read auto-sync flag; treating as disabled");
                false
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the busy flag on drop, so a cancelled cycle cannot wedge the
/// coordinator.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NoteRepository, SqliteNoteRepository};
    use crate::error::Result;
    use crate::models::NoteDraft;
    use crate::remote::{ChangedSince, UpsertAck, UpsertPayload};
    use crate::sync::events::NoteEventKind;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    /// Client that counts list calls through a shared handle and can be
    /// made slow enough to observe an in-flight cycle.
    struct CountingClient {
        list_calls: Arc<AtomicUsize>,
        list_delay: Duration,
    }

    impl CountingClient {
        fn new() -> (Self, Arc<AtomicUsize>) {
            Self::slow(Duration::ZERO)
        }

        fn slow(delay: Duration) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    list_calls: Arc::clone(&calls),
                    list_delay: delay,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl RemoteClient for CountingClient {
        async fn list_changed_since(
            &self,
            _user_id: UserId,
            _since: Option<DateTime<Utc>>,
        ) -> Result<ChangedSince> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if !self.list_delay.is_zero() {
                tokio::time::sleep(self.list_delay).await;
            }
            Ok(ChangedSince::default())
        }

        async fn upsert_note(
            &self,
            _user_id: UserId,
            payload: &UpsertPayload,
        ) -> Result<UpsertAck> {
            Ok(UpsertAck {
                id: payload.id.clone().unwrap_or_else(|| "r-auto".into()),
                version: payload.version,
                updated_at: payload.updated_at,
            })
        }

        async fn delete_note(&self, _user_id: UserId, _remote_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn coordinator(client: CountingClient) -> SyncCoordinator<CountingClient> {
        let db = Arc::new(Database::open_in_memory().unwrap());
        SyncCoordinator::new(SyncEngine::new(db, client), UserId::GUEST)
    }

    fn database(coordinator: &SyncCoordinator<CountingClient>) -> &Arc<Database> {
        coordinator.inner.engine.database()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_overlapping_sync_is_a_zero_noop() {
        let (client, _calls) = CountingClient::slow(Duration::from_millis(300));
        let coordinator = Arc::new(coordinator(client));
        SqliteNoteRepository::new(database(&coordinator))
            .create(UserId::GUEST, NoteDraft::new("pending", ""))
            .unwrap();

        let background = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.sync_now().await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(coordinator.is_busy());

        // Second caller neither blocks nor errors, and mutates nothing.
        let overlapped = coordinator.sync_now().await.unwrap();
        assert_eq!(overlapped, SyncOutcome::default());

        let first = background.await.unwrap();
        assert_eq!(first.pushed, 1);
        assert!(!coordinator.is_busy());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_realtime_burst_triggers_one_sync() {
        let (client, calls) = CountingClient::new();
        let coordinator = coordinator(client).with_debounce_window(Duration::from_millis(40));

        let (tx, rx) = mpsc::unbounded_channel();
        coordinator.attach_realtime(rx);

        for _ in 0..4 {
            tx.send(NoteEvent::new(NoteEventKind::Updated, Some("r1".into())))
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        coordinator.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_realtime_sync_respects_auto_sync_flag() {
        let (client, calls) = CountingClient::new();
        let coordinator = coordinator(client).with_debounce_window(Duration::from_millis(20));
        SqliteSyncSettingsRepository::new(database(&coordinator))
            .set_auto_sync_enabled(UserId::GUEST, false)
            .unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        coordinator.attach_realtime(rx);
        tx.send(NoteEvent::new(NoteEventKind::Created, None)).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        coordinator.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_periodic_loop_stops_when_flag_cleared() {
        let (client, calls) = CountingClient::new();
        let coordinator = coordinator(client).with_sync_interval(Duration::from_millis(25));

        coordinator.start_periodic();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(calls.load(Ordering::SeqCst) >= 1);

        SqliteSyncSettingsRepository::new(database(&coordinator))
            .set_auto_sync_enabled(UserId::GUEST, false)
            .unwrap();
        // Give the loop a tick to observe the flag and bail out.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), settled);
        coordinator.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_cancels_pending_debounce() {
        let (client, calls) = CountingClient::new();
        let coordinator = coordinator(client).with_debounce_window(Duration::from_millis(50));

        let (tx, rx) = mpsc::unbounded_channel();
        coordinator.attach_realtime(rx);
        tx.send(NoteEvent::new(NoteEventKind::Deleted, Some("r1".into())))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        coordinator.stop();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // stop is idempotent
        coordinator.stop();
    }
}
