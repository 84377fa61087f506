//! Local cache ↔ remote store reconciliation
//!
//! The local cache always holds the running totals. Reconciling fetches the
//! remote record, merges field-wise by maximum, stores the merge locally and
//! pushes it once when the local side had something the remote lacked.
//! Failures leave the cache intact and mark the sync as pending.

use std::cell::{Cell, RefCell};

use super::store::{RemoteStore, StoreError, SubmitScore};
use super::SyncError;
use crate::leaderboard::{MAX_LEADERBOARD, PlayerRecord, Progress};
use crate::persistence::{ProgressCache, Storage};
use crate::sim::RunSummary;

/// Longest accepted player name (characters)
pub const MAX_NAME_LEN: usize = 20;

/// Observable sync state, for the HUD
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub offline: bool,
    /// Local progress has not reached the remote store yet
    pub pending_sync: bool,
    /// A reconcile is in flight
    pub syncing: bool,
    /// Last recoverable failure, cleared by the next successful sync
    pub last_error: Option<String>,
}

/// What a sync attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No network; local cache only
    Offline,
    /// No player name stored yet
    NoPlayer,
    /// Another reconcile was already running
    Busy,
    /// Remote already had everything; holds the merged progress
    UpToDate(Progress),
    /// Merged progress was pushed
    Pushed(Progress),
    /// Remote call failed; retry later
    Deferred(StoreError),
}

/// Validate and normalize a player name
pub fn normalize_name(name: &str) -> Result<String, SyncError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(SyncError::InvalidName);
    }
    Ok(name.to_string())
}

/// Keeps a player's progress in step between the local cache and a remote store
pub struct ScoreSync<S, R> {
    cache: ProgressCache<S>,
    remote: R,
    status: RefCell<SyncStatus>,
    /// Set when the cache changed while a pass was in flight
    changed_during_pass: Cell<bool>,
}

impl<S: Storage, R: RemoteStore> ScoreSync<S, R> {
    pub fn new(storage: S, remote: R, online: bool) -> Self {
        Self {
            cache: ProgressCache::new(storage),
            remote,
            status: RefCell::new(SyncStatus {
                offline: !online,
                ..Default::default()
            }),
            changed_during_pass: Cell::new(false),
        }
    }

    pub fn cache(&self) -> &ProgressCache<S> {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        !self.status.borrow().offline
    }

    pub fn player_name(&self) -> Option<String> {
        self.cache.player_name()
    }

    /// Cached progress for the current player
    pub fn local_progress(&self) -> Progress {
        self.player_name()
            .map(|name| self.cache.load(&name))
            .unwrap_or_default()
    }

    /// Claim a player name.
    ///
    /// Online, the name is registered with the remote store first and only
    /// stored locally once that succeeds. Offline it is stored locally and
    /// registered by the next push.
    pub async fn register_player(&self, name: &str) -> Result<String, SyncError> {
        let name = normalize_name(name)?;

        if self.is_online() {
            self.remote
                .submit_score(&SubmitScore::register(&name))
                .await?;
        } else {
            log::info!("Offline: player name {name} saved locally");
        }

        self.cache.set_player_name(&name)?;
        Ok(name)
    }

    /// Session start: reconcile once if online
    pub async fn start_session(&self) -> SyncOutcome {
        let Some(name) = self.player_name() else {
            return SyncOutcome::NoPlayer;
        };
        if !self.is_online() {
            log::info!("Offline: using cached progress for {name}");
            return SyncOutcome::Offline;
        }
        self.reconcile(&name).await
    }

    /// Add a finished run to the local totals and reconcile if online
    pub async fn record_run(&self, summary: &RunSummary) -> SyncOutcome {
        let Some(name) = self.player_name() else {
            log::warn!("Run finished without a player name; not recorded");
            return SyncOutcome::NoPlayer;
        };

        let mut progress = self.cache.load(&name);
        progress.accumulate(summary);
        if let Err(e) = self.cache.save(&name, &progress) {
            log::warn!("Failed to cache progress: {e}");
        }

        if !self.is_online() {
            self.status.borrow_mut().pending_sync = true;
            log::info!("Offline: run saved locally, sync pending");
            return SyncOutcome::Offline;
        }
        self.reconcile(&name).await
    }

    /// Network state changed. Going back online retries a pending sync once.
    pub async fn set_online(&self, online: bool) -> Option<SyncOutcome> {
        let (was_offline, pending) = {
            let mut status = self.status.borrow_mut();
            let was_offline = status.offline;
            status.offline = !online;
            (was_offline, status.pending_sync)
        };

        if !(online && was_offline) {
            return None;
        }
        log::info!("Back online");
        if !pending {
            return None;
        }
        let name = self.player_name()?;
        Some(self.reconcile(&name).await)
    }

    /// User-initiated retry
    pub async fn retry_sync(&self) -> SyncOutcome {
        if !self.is_online() {
            return SyncOutcome::Offline;
        }
        match self.player_name() {
            Some(name) => self.reconcile(&name).await,
            None => SyncOutcome::NoPlayer,
        }
    }

    /// Current leaderboard
    pub async fn leaderboard(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        if !self.is_online() {
            return Err(StoreError::Unavailable("offline".to_string()));
        }
        self.remote.leaderboard(MAX_LEADERBOARD).await
    }

    async fn reconcile(&self, name: &str) -> SyncOutcome {
        {
            let mut status = self.status.borrow_mut();
            if status.syncing {
                // The in-flight pass may already be past its last cache read
                status.pending_sync = true;
                self.changed_during_pass.set(true);
                return SyncOutcome::Busy;
            }
            status.syncing = true;
        }
        self.changed_during_pass.set(false);

        let mut result = self.fetch_merge_push(name).await;
        if result.is_ok() && self.changed_during_pass.replace(false) {
            log::debug!("Progress for {name} changed during sync; reconciling again");
            result = match (result, self.fetch_merge_push(name).await) {
                (Ok(SyncOutcome::Pushed(_)), Ok(SyncOutcome::UpToDate(p))) => {
                    Ok(SyncOutcome::Pushed(p))
                }
                (_, second) => second,
            };
        }

        let mut status = self.status.borrow_mut();
        status.syncing = false;
        match result {
            Ok(outcome) => {
                // A change after the second pass's read stays pending
                status.pending_sync = self.changed_during_pass.replace(false);
                status.last_error = None;
                outcome
            }
            Err(e) => {
                log::warn!("Score sync for {name} failed: {e}");
                status.pending_sync = true;
                status.last_error = Some(e.to_string());
                SyncOutcome::Deferred(e)
            }
        }
    }

    async fn fetch_merge_push(&self, name: &str) -> Result<SyncOutcome, StoreError> {
        let remote = self.remote.player(name).await?;

        // Read after the fetch so runs recorded meanwhile are kept
        let local = self.cache.load(name);
        let merged = remote.map_or(local, |r| local.merge_max(&r));
        if let Err(e) = self.cache.save(name, &merged) {
            log::warn!("Failed to cache merged progress: {e}");
        }

        let needs_push = match remote {
            Some(r) => local.exceeds(&r),
            None => !local.is_empty(),
        };
        if !needs_push {
            log::debug!("Progress for {name} already up to date");
            return Ok(SyncOutcome::UpToDate(merged));
        }

        self.remote
            .submit_score(&SubmitScore::update(name, merged))
            .await?;
        log::info!(
            "Synced {name}: score {} time {} attempts {}",
            merged.score,
            merged.time,
            merged.attempts
        );
        Ok(SyncOutcome::Pushed(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use crate::sync::MemoryStore;
    use pollster::block_on;
    use std::future::Future;
    use std::pin::{Pin, pin};
    use std::task::{Context, Poll, Waker};

    /// Returns `Pending` on its first poll
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    /// Memory store whose calls suspend once, like a network round trip
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryStore,
        slow_player: bool,
        slow_submit: bool,
    }

    impl RemoteStore for SlowStore {
        async fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerRecord>, StoreError> {
            self.inner.leaderboard(limit).await
        }

        async fn player(&self, name: &str) -> Result<Option<Progress>, StoreError> {
            if self.slow_player {
                YieldOnce(false).await;
            }
            self.inner.player(name).await
        }

        async fn submit_score(&self, request: &SubmitScore) -> Result<PlayerRecord, StoreError> {
            if self.slow_submit {
                YieldOnce(false).await;
            }
            self.inner.submit_score(request).await
        }
    }

    fn slow_sync(store: SlowStore) -> ScoreSync<MemoryStorage, SlowStore> {
        let sync = ScoreSync::new(MemoryStorage::new(), store, true);
        sync.cache().set_player_name("ada").unwrap();
        sync.cache().save("ada", &progress(100, 10, 1)).unwrap();
        sync
    }

    fn progress(score: u32, time: u32, attempts: u32) -> Progress {
        Progress {
            score,
            time,
            attempts,
        }
    }

    fn summary(score: u32, elapsed_time: u32, attempts: u32) -> RunSummary {
        RunSummary {
            score,
            elapsed_time,
            attempts,
        }
    }

    fn sync_for(name: &str, online: bool) -> ScoreSync<MemoryStorage, MemoryStore> {
        let sync = ScoreSync::new(MemoryStorage::new(), MemoryStore::new(), online);
        sync.cache().set_player_name(name).unwrap();
        sync
    }

    #[test]
    fn test_session_start_merges_and_pushes_once() {
        let sync = sync_for("ada", true);
        sync.cache().save("ada", &progress(100, 30, 2)).unwrap();
        sync.remote()
            .insert(PlayerRecord::new("ada", progress(50, 40, 1), 0.0));

        let outcome = block_on(sync.start_session());
        assert_eq!(outcome, SyncOutcome::Pushed(progress(100, 40, 2)));
        assert_eq!(sync.remote().submissions(), 1);
        assert_eq!(sync.cache().load("ada"), progress(100, 40, 2));
        assert_eq!(
            sync.remote().record("ada").map(|r| r.progress()),
            Some(progress(100, 40, 2))
        );

        // Second pass finds nothing new
        let outcome = block_on(sync.start_session());
        assert_eq!(outcome, SyncOutcome::UpToDate(progress(100, 40, 2)));
        assert_eq!(sync.remote().submissions(), 1);
    }

    #[test]
    fn test_remote_ahead_is_pulled_without_push() {
        let sync = sync_for("ada", true);
        sync.remote()
            .insert(PlayerRecord::new("ada", progress(900, 100, 7), 0.0));

        let outcome = block_on(sync.start_session());
        assert_eq!(outcome, SyncOutcome::UpToDate(progress(900, 100, 7)));
        assert_eq!(sync.remote().submissions(), 0);
        assert_eq!(sync.local_progress(), progress(900, 100, 7));
    }

    #[test]
    fn test_empty_on_both_sides_does_not_push() {
        let sync = sync_for("ada", true);
        assert_eq!(
            block_on(sync.start_session()),
            SyncOutcome::UpToDate(Progress::default())
        );
        assert_eq!(sync.remote().submissions(), 0);
    }

    #[test]
    fn test_offline_round_trip() {
        let sync = sync_for("ada", false);
        sync.remote().set_reachable(false);

        assert_eq!(block_on(sync.start_session()), SyncOutcome::Offline);
        assert_eq!(block_on(sync.record_run(&summary(700, 20, 1))), SyncOutcome::Offline);
        assert_eq!(block_on(sync.record_run(&summary(300, 60, 2))), SyncOutcome::Offline);
        assert!(sync.status().pending_sync);
        assert_eq!(sync.local_progress(), progress(1000, 80, 3));

        sync.remote().set_reachable(true);
        let outcome = block_on(sync.set_online(true));
        assert_eq!(outcome, Some(SyncOutcome::Pushed(progress(1000, 80, 3))));
        assert_eq!(sync.remote().submissions(), 1);
        assert!(!sync.status().pending_sync);

        // Already online: no further attempt
        assert_eq!(block_on(sync.set_online(true)), None);
        assert_eq!(sync.remote().submissions(), 1);
    }

    #[test]
    fn test_online_without_pending_does_nothing() {
        let sync = sync_for("ada", false);
        assert_eq!(block_on(sync.set_online(true)), None);
        assert!(sync.is_online());
        assert_eq!(block_on(sync.set_online(false)), None);
        assert!(sync.status().offline);
    }

    #[test]
    fn test_failure_keeps_cache_and_marks_pending() {
        let sync = sync_for("ada", true);
        sync.remote().set_reachable(false);

        let outcome = block_on(sync.record_run(&summary(400, 30, 1)));
        assert!(matches!(
            outcome,
            SyncOutcome::Deferred(StoreError::Unavailable(_))
        ));
        let status = sync.status();
        assert!(status.pending_sync);
        assert!(status.last_error.is_some());
        assert!(!status.syncing);
        assert_eq!(sync.local_progress(), progress(400, 30, 1));

        sync.remote().set_reachable(true);
        assert_eq!(
            block_on(sync.retry_sync()),
            SyncOutcome::Pushed(progress(400, 30, 1))
        );
        assert_eq!(sync.status(), SyncStatus::default());
    }

    #[test]
    fn test_record_run_accumulates_online() {
        let sync = sync_for("ada", true);
        block_on(sync.record_run(&summary(500, 40, 1)));
        block_on(sync.record_run(&summary(200, 60, 1)));
        assert_eq!(
            sync.remote().record("ada").map(|r| r.progress()),
            Some(progress(700, 100, 2))
        );
        assert_eq!(sync.remote().submissions(), 2);
    }

    #[test]
    fn test_no_player() {
        let sync = ScoreSync::new(MemoryStorage::new(), MemoryStore::new(), true);
        assert_eq!(block_on(sync.start_session()), SyncOutcome::NoPlayer);
        assert_eq!(
            block_on(sync.record_run(&summary(100, 10, 1))),
            SyncOutcome::NoPlayer
        );
        assert_eq!(block_on(sync.retry_sync()), SyncOutcome::NoPlayer);
    }

    #[test]
    fn test_register_player() {
        let sync = ScoreSync::new(MemoryStorage::new(), MemoryStore::new(), true);
        assert_eq!(
            block_on(sync.register_player("   ")),
            Err(SyncError::InvalidName)
        );
        assert_eq!(
            block_on(sync.register_player("a name that is far too long")),
            Err(SyncError::InvalidName)
        );
        assert_eq!(sync.player_name(), None);

        assert_eq!(block_on(sync.register_player(" ada ")), Ok("ada".to_string()));
        assert_eq!(sync.player_name(), Some("ada".to_string()));
        assert!(sync.remote().record("ada").is_some());
    }

    #[test]
    fn test_register_failure_keeps_old_name() {
        let sync = sync_for("ada", true);
        sync.remote().set_reachable(false);
        let result = block_on(sync.register_player("bob"));
        assert!(matches!(result, Err(SyncError::Store(StoreError::Unavailable(_)))));
        assert_eq!(sync.player_name(), Some("ada".to_string()));
    }

    #[test]
    fn test_register_offline_saves_locally() {
        let sync = ScoreSync::new(MemoryStorage::new(), MemoryStore::new(), false);
        assert_eq!(block_on(sync.register_player("ada")), Ok("ada".to_string()));
        assert_eq!(sync.player_name(), Some("ada".to_string()));
        assert!(sync.remote().record("ada").is_none());
    }

    #[test]
    fn test_leaderboard_offline() {
        let sync = sync_for("ada", false);
        assert!(matches!(
            block_on(sync.leaderboard()),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_run_recorded_during_fetch_is_kept() {
        let sync = slow_sync(SlowStore {
            slow_player: true,
            ..Default::default()
        });
        let mut cx = Context::from_waker(Waker::noop());

        let mut session = pin!(sync.start_session());
        assert!(session.as_mut().poll(&mut cx).is_pending());
        assert!(sync.status().syncing);

        assert_eq!(block_on(sync.record_run(&summary(500, 30, 1))), SyncOutcome::Busy);
        assert!(sync.status().pending_sync);

        assert_eq!(block_on(session), SyncOutcome::Pushed(progress(600, 40, 2)));
        assert_eq!(sync.local_progress(), progress(600, 40, 2));
        assert_eq!(
            sync.remote().inner.record("ada").map(|r| r.progress()),
            Some(progress(600, 40, 2))
        );
        let status = sync.status();
        assert!(!status.pending_sync);
        assert!(!status.syncing);
    }

    #[test]
    fn test_run_recorded_during_push_is_pushed_again() {
        let sync = slow_sync(SlowStore {
            slow_submit: true,
            ..Default::default()
        });
        let mut cx = Context::from_waker(Waker::noop());

        let mut session = pin!(sync.start_session());
        assert!(session.as_mut().poll(&mut cx).is_pending());
        assert_eq!(block_on(sync.record_run(&summary(500, 30, 1))), SyncOutcome::Busy);

        assert_eq!(block_on(session), SyncOutcome::Pushed(progress(600, 40, 2)));
        assert_eq!(sync.remote().inner.submissions(), 2);
        assert_eq!(
            sync.remote().inner.record("ada").map(|r| r.progress()),
            Some(progress(600, 40, 2))
        );
        assert!(!sync.status().pending_sync);
    }
}
