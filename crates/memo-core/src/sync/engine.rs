//! The reconciliation cycle
//!
//! One cycle runs four strictly sequential phases: drain the delete
//! tombstones, push dirty notes, pull remote changes since the watermark,
//! then advance the watermark. Ordering matters: deletes reach the server
//! before pushes so a freshly pulled window cannot resurrect a note the
//! user already removed, and pushes precede the pull so local edits win
//! their own round trip instead of being shadowed.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{
    Database, NoteRepository, RemoteApply, SqliteNoteRepository, SqliteSyncSettingsRepository,
    SqliteTombstoneRepository, SyncSettingsRepository, TombstoneRepository,
};
use crate::error::Result;
use crate::models::UserId;
use crate::remote::{RemoteClient, UpsertPayload};

/// Tombstones drained per cycle; the rest wait for the next one
const TOMBSTONE_BATCH: usize = 50;

/// Counts reported by one reconciliation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Dirty notes the server acknowledged
    pub pushed: usize,
    /// Tombstones delivered (or found already gone)
    pub deleted: usize,
    /// Remote records applied locally
    pub pulled: usize,
}

/// Orchestrates one full reconciliation cycle against a remote client
///
/// The engine itself is stateless between cycles; mutual exclusion of
/// concurrent cycles belongs to [`SyncCoordinator`](super::SyncCoordinator).
pub struct SyncEngine<C> {
    db: Arc<Database>,
    client: C,
}

impl<C: RemoteClient> SyncEngine<C> {
    pub const fn new(db: Arc<Database>, client: C) -> Self {
        Self { db, client }
    }

    /// The database this engine reconciles
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run one full cycle for `user_id`
    ///
    /// Per-item failures during the tombstone and push phases are isolated
    /// and logged; a connectivity failure during the tombstone drain, or
    /// any failure during the pull, aborts the cycle. An aborted pull
    /// leaves the watermark untouched so the next cycle retries the same
    /// window.
    pub async fn run_cycle(&self, user_id: UserId) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        self.drain_tombstones(user_id, &mut outcome).await?;
        self.push_dirty(user_id, &mut outcome).await?;
        self.pull_remote(user_id, &mut outcome).await?;

        tracing::debug!(
            pushed = outcome.pushed,
            deleted = outcome.deleted,
            pulled = outcome.pulled,
            "sync cycle finished"
        );
        Ok(outcome)
    }

    async fn drain_tombstones(&self, user_id: UserId, outcome: &mut SyncOutcome) -> Result<()> {
        let queue = SqliteTombstoneRepository::new(&self.db);

        for tombstone in queue.list(user_id, TOMBSTONE_BATCH)? {
            match self.client.delete_note(user_id, &tombstone.remote_id).await {
                Ok(()) => {
                    if let Err(error) = queue.remove(tombstone.id) {
                        tracing::warn!(
                            id = tombstone.id,
                            %error,
                            "could not drop acknowledged tombstone"
                        );
                        continue;
                    }
                    outcome.deleted += 1;
                }
                Err(error) => {
                    if let Err(store_error) = queue.bump_attempt(tombstone.id, &error.to_string())
                    {
                        tracing::warn!(
                            id = tombstone.id,
                            %store_error,
                            "could not record tombstone attempt"
                        );
                    }
                    if error.is_connectivity() {
                        // Deletes must be visible on the server before we
                        // push or pull anything; an unreachable server ends
                        // the cycle here.
                        return Err(error);
                    }
                    tracing::warn!(
                        remote_id = %tombstone.remote_id,
                        %error,
                        "remote delete failed; tombstone stays queued"
                    );
                }
            }
        }

        Ok(())
    }

    async fn push_dirty(&self, user_id: UserId, outcome: &mut SyncOutcome) -> Result<()> {
        let notes = SqliteNoteRepository::new(&self.db);

        for note in notes.list_dirty(user_id)? {
            let payload = UpsertPayload::from(&note);
            match self.client.upsert_note(user_id, &payload).await {
                Ok(ack) => match notes.mark_pushed(&note.id, note.version, &ack) {
                    Ok(true) => outcome.pushed += 1,
                    Ok(false) => {
                        tracing::debug!(note = %note.id, "note changed during push; stays dirty");
                    }
                    Err(error) => {
                        tracing::warn!(note = %note.id, %error, "could not record push ack");
                    }
                },
                Err(error) => {
                    // One bad note must never block its siblings.
                    tracing::warn!(note = %note.id, %error, "push failed; note stays dirty");
                }
            }
        }

        Ok(())
    }

    async fn pull_remote(&self, user_id: UserId, outcome: &mut SyncOutcome) -> Result<()> {
        let settings = SqliteSyncSettingsRepository::new(&self.db);
        let since = settings.watermark(user_id)?;

        let changed = self.client.list_changed_since(user_id, since).await?;

        let notes = SqliteNoteRepository::new(&self.db);
        let mut max_updated: Option<DateTime<Utc>> = None;
        for remote in &changed.items {
            match notes.upsert_from_remote(user_id, remote)? {
                RemoteApply::Inserted | RemoteApply::Updated => outcome.pulled += 1,
                RemoteApply::SkippedDirty => {
                    tracing::debug!(
                        remote_id = %remote.remote_id,
                        "local edits pending; remote copy ignored"
                    );
                }
                RemoteApply::SkippedStale => {}
            }
            max_updated =
                Some(max_updated.map_or(remote.updated_at, |seen| seen.max(remote.updated_at)));
        }

        let candidate = changed
            .server_now
            .or(max_updated)
            .unwrap_or_else(Utc::now);
        settings.advance_watermark(user_id, candidate)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{NoteDraft, NoteId};
    use crate::remote::{ChangedSince, RemoteNote, UpsertAck};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted stand-in for the HTTP client: seeded results are handed
    /// out in order; unseeded calls succeed with echo-style defaults.
    #[derive(Default)]
    struct StubClient {
        calls: Mutex<Vec<String>>,
        list_results: Mutex<VecDeque<Result<ChangedSince>>>,
        upsert_results: Mutex<VecDeque<Result<UpsertAck>>>,
        delete_results: Mutex<VecDeque<Result<()>>>,
    }

    impl StubClient {
        fn new() -> Self {
            Self::default()
        }

        fn seed_list(&self, result: Result<ChangedSince>) {
            self.list_results.lock().unwrap().push_back(result);
        }

        fn seed_upsert(&self, result: Result<UpsertAck>) {
            self.upsert_results.lock().unwrap().push_back(result);
        }

        fn seed_delete(&self, result: Result<()>) {
            self.delete_results.lock().unwrap().push_back(result);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteClient for StubClient {
        async fn list_changed_since(
            &self,
            _user_id: UserId,
            _since: Option<DateTime<Utc>>,
        ) -> Result<ChangedSince> {
            self.calls.lock().unwrap().push("list".into());
            self.list_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ChangedSince::default()))
        }

        async fn upsert_note(
            &self,
            _user_id: UserId,
            payload: &UpsertPayload,
        ) -> Result<UpsertAck> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upsert:{}", payload.title));
            self.upsert_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(UpsertAck {
                        id: payload.id.clone().unwrap_or_else(|| "r-auto".into()),
                        version: payload.version,
                        updated_at: payload.updated_at,
                    })
                })
        }

        async fn delete_note(&self, _user_id: UserId, remote_id: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete:{remote_id}"));
            self.delete_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, secs).unwrap()
    }

    fn ack(id: &str, version: i64, updated_at: DateTime<Utc>) -> UpsertAck {
        UpsertAck {
            id: id.to_string(),
            version,
            updated_at,
        }
    }

    fn remote(remote_id: &str, title: &str, updated_at: DateTime<Utc>) -> RemoteNote {
        RemoteNote {
            remote_id: remote_id.to_string(),
            title: title.to_string(),
            content: String::new(),
            folder_id: None,
            is_favorite: false,
            is_deleted: false,
            updated_at,
            version: 1,
        }
    }

    fn changed(items: Vec<RemoteNote>, server_now: Option<DateTime<Utc>>) -> ChangedSince {
        ChangedSince { items, server_now }
    }

    fn engine() -> SyncEngine<StubClient> {
        SyncEngine::new(Arc::new(Database::open_in_memory().unwrap()), StubClient::new())
    }

    fn create_note(engine: &SyncEngine<StubClient>, title: &str) -> NoteId {
        SqliteNoteRepository::new(engine.database())
            .create(UserId::GUEST, NoteDraft::new(title, ""))
            .unwrap()
            .id
    }

    fn pushed_note(engine: &SyncEngine<StubClient>, title: &str, remote_id: &str) -> NoteId {
        let notes = SqliteNoteRepository::new(engine.database());
        let note = notes
            .create(UserId::GUEST, NoteDraft::new(title, ""))
            .unwrap();
        notes
            .mark_pushed(&note.id, note.version, &ack(remote_id, 1, at(1)))
            .unwrap();
        note.id
    }

    #[tokio::test]
    async fn test_first_push_assigns_remote_identity() {
        let engine = engine();
        let id = create_note(&engine, "A");
        engine.client.seed_upsert(Ok(ack("r1", 1, at(10))));

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome {
                pushed: 1,
                deleted: 0,
                pulled: 0
            }
        );
        let note = SqliteNoteRepository::new(engine.database())
            .get(&id)
            .unwrap()
            .unwrap();
        assert!(!note.dirty);
        assert_eq!(note.remote_id.as_deref(), Some("r1"));
        assert_eq!(note.version, 1);
        assert_eq!(note.updated_at, at(10));
    }

    #[tokio::test]
    async fn test_push_failure_does_not_block_siblings() {
        let engine = engine();
        let first = create_note(&engine, "First");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = create_note(&engine, "Second");

        engine
            .client
            .seed_upsert(Err(Error::Network("connection refused".into())));
        engine.client.seed_upsert(Ok(ack("r2", 1, at(10))));

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();
        assert_eq!(outcome.pushed, 1);

        let notes = SqliteNoteRepository::new(engine.database());
        let failed = notes.get(&first).unwrap().unwrap();
        assert!(failed.dirty);
        assert_eq!(failed.version, 1);

        let succeeded = notes.get(&second).unwrap().unwrap();
        assert!(!succeeded.dirty);
        assert_eq!(succeeded.remote_id.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_pull_inserts_unseen_remote_note() {
        let engine = engine();
        engine
            .client
            .seed_list(Ok(changed(vec![remote("r5", "From server", at(7))], None)));

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();
        assert_eq!(outcome.pulled, 1);

        let notes = SqliteNoteRepository::new(engine.database())
            .list(UserId::GUEST)
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "From server");
        assert!(!notes[0].dirty);
    }

    #[tokio::test]
    async fn test_pull_never_overwrites_dirty_note() {
        let engine = engine();
        let id = pushed_note(&engine, "Mine", "r9");
        let notes = SqliteNoteRepository::new(engine.database());
        notes
            .update(
                &id,
                crate::models::NoteChanges {
                    content: Some("local edit".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        // The push fails, so the note is still dirty when the pull returns
        // a newer remote copy of the same record.
        engine
            .client
            .seed_upsert(Err(Error::Timeout("10s elapsed".into())));
        engine
            .client
            .seed_list(Ok(changed(vec![remote("r9", "Theirs", at(50))], None)));

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();
        assert_eq!(outcome.pushed, 0);
        assert_eq!(outcome.pulled, 0);

        let note = notes.get(&id).unwrap().unwrap();
        assert!(note.dirty);
        assert_eq!(note.title, "Mine");
        assert_eq!(note.content, "local edit");
    }

    #[tokio::test]
    async fn test_pull_applies_newer_remote_copy_to_clean_note() {
        let engine = engine();
        let id = pushed_note(&engine, "Old title", "r2");
        let mut incoming = remote("r2", "New title", at(7));
        incoming.version = 3;
        engine.client.seed_list(Ok(changed(vec![incoming], None)));

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();
        assert_eq!(outcome.pulled, 1);

        let note = SqliteNoteRepository::new(engine.database())
            .get(&id)
            .unwrap()
            .unwrap();
        assert_eq!(note.title, "New title");
        assert_eq!(note.updated_at, at(7));
        assert_eq!(note.version, 3);
        assert!(!note.dirty);
    }

    #[tokio::test]
    async fn test_tombstone_drained_before_everything_else() {
        let engine = engine();
        let id = pushed_note(&engine, "Doomed", "r3");
        let notes = SqliteNoteRepository::new(engine.database());
        notes.delete_permanent(&id).unwrap();

        let queue = SqliteTombstoneRepository::new(engine.database());
        assert_eq!(queue.count(UserId::GUEST).unwrap(), 1);

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();
        assert_eq!(outcome.deleted, 1);
        assert_eq!(queue.count(UserId::GUEST).unwrap(), 0);
        assert_eq!(engine.client.calls()[0], "delete:r3");
    }

    #[tokio::test]
    async fn test_duplicate_tombstones_both_resolve() {
        let engine = engine();
        let id = pushed_note(&engine, "Doomed", "r3");
        SqliteNoteRepository::new(engine.database())
            .delete_permanent(&id)
            .unwrap();
        // A second queued delete for the same remote id; the server will
        // report the second as already gone, which the client maps to Ok.
        engine
            .database()
            .lock()
            .execute(
                "INSERT INTO sync_queue (user_id, remote_id, created_at)
                 VALUES (1, 'r3', '2025-06-01T12:00:30.000Z')",
                [],
            )
            .unwrap();

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();

        assert_eq!(outcome.deleted, 2);
        let queue = SqliteTombstoneRepository::new(engine.database());
        assert_eq!(queue.count(UserId::GUEST).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connectivity_failure_during_drain_aborts_cycle() {
        let engine = engine();
        let doomed = pushed_note(&engine, "Doomed", "r3");
        let notes = SqliteNoteRepository::new(engine.database());
        notes.delete_permanent(&doomed).unwrap();
        let dirty = create_note(&engine, "Pending edit");

        engine
            .client
            .seed_delete(Err(Error::Timeout("10s elapsed".into())));

        let result = engine.run_cycle(UserId::GUEST).await;
        assert!(matches!(result, Err(Error::Timeout(_))));

        // Nothing after the failed delete ran.
        assert_eq!(engine.client.calls(), vec!["delete:r3".to_string()]);
        assert!(notes.get(&dirty).unwrap().unwrap().dirty);

        let queue = SqliteTombstoneRepository::new(engine.database());
        let tombstone = queue.list(UserId::GUEST, 10).unwrap().remove(0);
        assert_eq!(tombstone.try_count, 1);
        assert!(tombstone.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_application_failure_during_drain_continues() {
        let engine = engine();
        let first = pushed_note(&engine, "First", "r1");
        let second = pushed_note(&engine, "Second", "r2");
        let notes = SqliteNoteRepository::new(engine.database());
        notes.delete_permanent(&first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        notes.delete_permanent(&second).unwrap();

        engine.client.seed_delete(Err(Error::Api {
            status: 403,
            message: "forbidden".into(),
        }));

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();
        assert_eq!(outcome.deleted, 1);

        let queue = SqliteTombstoneRepository::new(engine.database());
        let pending = queue.list(UserId::GUEST, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].remote_id, "r1");
        assert_eq!(pending[0].try_count, 1);
    }

    #[tokio::test]
    async fn test_watermark_advances_even_on_empty_pull() {
        let engine = engine();
        let settings = SqliteSyncSettingsRepository::new(engine.database());
        assert_eq!(settings.watermark(UserId::GUEST).unwrap(), None);

        engine.run_cycle(UserId::GUEST).await.unwrap();
        let first = settings.watermark(UserId::GUEST).unwrap().unwrap();

        engine.run_cycle(UserId::GUEST).await.unwrap();
        let second = settings.watermark(UserId::GUEST).unwrap().unwrap();
        assert!(second >= first);
    }

    #[tokio::test]
    async fn test_watermark_prefers_server_now() {
        let engine = engine();
        engine.client.seed_list(Ok(changed(
            vec![remote("r1", "A", at(7))],
            Some(at(9)),
        )));

        engine.run_cycle(UserId::GUEST).await.unwrap();

        let settings = SqliteSyncSettingsRepository::new(engine.database());
        assert_eq!(settings.watermark(UserId::GUEST).unwrap(), Some(at(9)));
    }

    #[tokio::test]
    async fn test_watermark_tracks_max_item_timestamp() {
        let engine = engine();
        engine.client.seed_list(Ok(changed(
            vec![
                remote("r1", "A", at(7)),
                remote("r2", "B", at(3)),
                remote("r3", "C", at(5)),
            ],
            None,
        )));

        engine.run_cycle(UserId::GUEST).await.unwrap();

        let settings = SqliteSyncSettingsRepository::new(engine.database());
        assert_eq!(settings.watermark(UserId::GUEST).unwrap(), Some(at(7)));
    }

    #[tokio::test]
    async fn test_failed_pull_leaves_watermark_unchanged() {
        let engine = engine();
        let settings = SqliteSyncSettingsRepository::new(engine.database());
        settings.advance_watermark(UserId::GUEST, at(20)).unwrap();

        engine
            .client
            .seed_list(Err(Error::Network("connection reset".into())));

        let result = engine.run_cycle(UserId::GUEST).await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(settings.watermark(UserId::GUEST).unwrap(), Some(at(20)));
    }

    #[tokio::test]
    async fn test_pull_passes_stored_watermark_and_stale_items_do_not_count() {
        let engine = engine();
        let id = pushed_note(&engine, "Current", "r2");
        let notes = SqliteNoteRepository::new(engine.database());
        // Local clean copy already carries at(40).
        notes
            .mark_pushed(&id, 1, &ack("r2", 2, at(40)))
            .unwrap();

        engine
            .client
            .seed_list(Ok(changed(vec![remote("r2", "Stale", at(5))], None)));

        let outcome = engine.run_cycle(UserId::GUEST).await.unwrap();
        assert_eq!(outcome.pulled, 0);
        assert_eq!(
            notes.get(&id).unwrap().unwrap().title,
            "Current"
        );
    }
}
