//! Cache-first, remote-authoritative, write-through-on-success.
//!
//! [`Reconciler`] owns the view state of one scope and applies the three
//! steps every reconciled view shares: show the snapshot, take a remote
//! result, persist it when it succeeded.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::generation::{Generation, GenerationCounter};
use super::view::{Phase, ViewState};
use crate::cache::{CacheRecord, SnapshotKey, SnapshotRepository};

/// How a settled fetch was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetch succeeded and replaced the visible collection.
    Applied,
    /// The fetch failed; the visible collection was kept and an error set.
    Failed,
    /// A newer fetch started, or the view closed, before this one settled.
    Discarded,
}

/// Shared reconciliation state for one snapshot scope.
#[derive(Debug)]
pub struct Reconciler<T> {
    key: SnapshotKey,
    store: SnapshotRepository,
    state: watch::Sender<ViewState<T>>,
    generations: GenerationCounter,
    /// Set once any remote result has replaced the items.
    remote_applied: AtomicBool,
}

impl<T> Reconciler<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates an empty reconciler for `key`.
    #[must_use]
    pub fn new(key: SnapshotKey, store: SnapshotRepository) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            key,
            store,
            state,
            generations: GenerationCounter::new(),
            remote_applied: AtomicBool::new(false),
        }
    }

    /// Scope this reconciler reads and writes.
    #[must_use]
    pub const fn key(&self) -> &SnapshotKey {
        &self.key
    }

    /// Copy of the current view state.
    #[must_use]
    pub fn state(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.state.subscribe()
    }

    /// Whether the owning view is still alive.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.generations.is_open()
    }

    /// Reads the snapshot and shows it if nothing newer arrived meanwhile.
    ///
    /// Returns whether a snapshot was shown.
    pub async fn load_snapshot(&self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.state.send_if_modified(|s| {
            // A fetch already in flight keeps its phase.
            let idle = matches!(s.phase, Phase::Empty | Phase::CacheHit | Phase::CacheMiss);
            if idle {
                s.phase = Phase::CacheLoading;
            }
            idle
        });

        let cached = self.store.get::<Vec<T>>(&self.key).await;
        self.apply_snapshot(cached)
    }

    fn apply_snapshot(&self, cached: Option<CacheRecord<Vec<T>>>) -> bool {
        let mut shown = false;
        self.state.send_if_modified(|s| {
            // Only a remote result that was applied outranks the snapshot.
            if !self.generations.is_open() || self.remote_applied.load(Ordering::Acquire) {
                return false;
            }
            let reading = s.phase == Phase::CacheLoading;
            match cached {
                Some(record) => {
                    debug!(
                        "Showing snapshot for {} captured at {}",
                        self.key, record.captured_at
                    );
                    s.items = record.payload;
                    s.has_data = true;
                    // A failed fetch that settled first keeps its banner and phase.
                    if reading {
                        s.error = None;
                        s.phase = Phase::CacheHit;
                    }
                    shown = true;
                    true
                }
                None if reading => {
                    s.phase = Phase::CacheMiss;
                    true
                }
                None => false,
            }
        });
        shown
    }

    /// Starts a remote fetch, superseding any fetch still in flight.
    pub fn begin_fetch(&self) -> Generation {
        let token = self.generations.next();
        self.state.send_modify(|s| s.phase = Phase::RemoteLoading);
        token
    }

    /// Applies the result of the fetch started with `token`.
    pub async fn settle<E: Display>(
        &self,
        token: Generation,
        result: Result<Vec<T>, E>,
    ) -> RefreshOutcome {
        if !self.generations.is_current(token) {
            debug!("Discarding superseded result for {}", self.key);
            return RefreshOutcome::Discarded;
        }

        match result {
            Ok(items) => {
                let visible = items.clone();
                self.state.send_modify(|s| {
                    self.remote_applied.store(true, Ordering::Release);
                    s.items = visible;
                    s.has_data = true;
                    s.error = None;
                    s.phase = Phase::Fresh;
                });
                if self.generations.is_current(token) {
                    self.store.set(&self.key, &items).await;
                }
                RefreshOutcome::Applied
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Refresh of {} failed: {message}", self.key);
                self.state.send_modify(|s| {
                    s.error = Some(message);
                    s.phase = Phase::RefreshFailed;
                });
                RefreshOutcome::Failed
            }
        }
    }

    /// Shows or hides the full-screen loading indicator.
    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.loading != loading;
            s.loading = loading;
            changed
        });
    }

    /// Shows or hides the pull-to-refresh indicator.
    pub fn set_refreshing(&self, refreshing: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.refreshing != refreshing;
            s.refreshing = refreshing;
            changed
        });
    }

    /// Replaces the error banner without touching the items.
    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|s| s.error = error);
    }

    /// Marks the owning view as torn down; in-flight results are dropped.
    pub fn close(&self) {
        self.generations.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use civichat_api::{ContactId, GroupSummary};

    use super::*;

    async fn reconciler() -> Reconciler<GroupSummary> {
        let store = SnapshotRepository::in_memory().await.unwrap();
        Reconciler::new(SnapshotKey::groups(&ContactId::new("C1")), store)
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let r = reconciler().await;
        assert!(!r.load_snapshot().await);
        assert_eq!(r.state().phase, Phase::CacheMiss);
        assert!(!r.state().has_data);
    }

    #[tokio::test]
    async fn test_success_writes_through() {
        let r = reconciler().await;
        let groups = vec![GroupSummary::new("5", "Volunteers")];

        let token = r.begin_fetch();
        let outcome = r.settle(token, Ok::<_, String>(groups.clone())).await;

        assert_eq!(outcome, RefreshOutcome::Applied);
        assert_eq!(r.state().items, groups);
        assert_eq!(r.state().phase, Phase::Fresh);
        let stored = r.store.get::<Vec<GroupSummary>>(r.key()).await.unwrap();
        assert_eq!(stored.payload, groups);
    }

    #[tokio::test]
    async fn test_failure_keeps_items_and_skips_store() {
        let r = reconciler().await;
        let groups = vec![GroupSummary::new("5", "Volunteers")];
        let token = r.begin_fetch();
        r.settle(token, Ok::<_, String>(groups.clone())).await;

        let token = r.begin_fetch();
        let outcome = r.settle(token, Err::<Vec<GroupSummary>, _>("offline")).await;

        assert_eq!(outcome, RefreshOutcome::Failed);
        let state = r.state();
        assert_eq!(state.items, groups);
        assert_eq!(state.error.as_deref(), Some("offline"));
        assert_eq!(state.phase, Phase::RefreshFailed);
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let r = reconciler().await;
        let old = r.begin_fetch();
        let new = r.begin_fetch();

        let fresh = vec![GroupSummary::new("9", "Board")];
        assert_eq!(
            r.settle(new, Ok::<_, String>(fresh.clone())).await,
            RefreshOutcome::Applied
        );
        assert_eq!(
            r.settle(old, Ok::<_, String>(vec![GroupSummary::new("5", "Volunteers")]))
                .await,
            RefreshOutcome::Discarded
        );

        assert_eq!(r.state().items, fresh);
        let stored = r.store.get::<Vec<GroupSummary>>(r.key()).await.unwrap();
        assert_eq!(stored.payload, fresh);
    }

    #[tokio::test]
    async fn test_snapshot_does_not_override_fresh_result() {
        let r = reconciler().await;
        r.store
            .set(r.key(), &vec![GroupSummary::new("5", "Volunteers")])
            .await;

        // The snapshot is read, then the remote result lands before it is applied.
        r.state.send_modify(|s| s.phase = Phase::CacheLoading);
        let cached = r.store.get::<Vec<GroupSummary>>(r.key()).await;
        assert!(cached.is_some());

        let token = r.begin_fetch();
        let fresh = vec![GroupSummary::new("9", "Board")];
        r.settle(token, Ok::<_, String>(fresh.clone())).await;

        assert!(!r.apply_snapshot(cached));
        assert_eq!(r.state().items, fresh);
        assert_eq!(r.state().phase, Phase::Fresh);
    }

    #[tokio::test]
    async fn test_snapshot_shown_after_failed_fetch_keeps_error() {
        let r = reconciler().await;
        r.store
            .set(r.key(), &vec![GroupSummary::new("5", "Volunteers")])
            .await;

        // The snapshot is read, then a refresh starts and fails before it is applied.
        r.state.send_modify(|s| s.phase = Phase::CacheLoading);
        let cached = r.store.get::<Vec<GroupSummary>>(r.key()).await;
        let token = r.begin_fetch();
        r.settle(token, Err::<Vec<GroupSummary>, _>("offline")).await;

        assert!(r.apply_snapshot(cached));
        let state = r.state();
        assert_eq!(state.items, vec![GroupSummary::new("5", "Volunteers")]);
        assert!(state.has_data);
        assert_eq!(state.error.as_deref(), Some("offline"));
        assert_eq!(state.phase, Phase::RefreshFailed);
    }

    #[tokio::test]
    async fn test_snapshot_read_does_not_reset_fetch_in_flight() {
        let r = reconciler().await;
        r.begin_fetch();

        assert!(!r.load_snapshot().await);
        assert_eq!(r.state().phase, Phase::RemoteLoading);
    }

    #[tokio::test]
    async fn test_closed_reconciler_ignores_everything() {
        let r = reconciler().await;
        let token = r.begin_fetch();
        r.close();

        let outcome = r
            .settle(token, Ok::<_, String>(vec![GroupSummary::new("5", "Volunteers")]))
            .await;
        assert_eq!(outcome, RefreshOutcome::Discarded);
        assert!(r.state().items.is_empty());
        assert!(!r.load_snapshot().await);
        assert!(r.store.get::<Vec<GroupSummary>>(r.key()).await.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let r = reconciler().await;
        let mut rx = r.subscribe();

        let token = r.begin_fetch();
        r.settle(token, Ok::<_, String>(vec![GroupSummary::new("5", "Volunteers")]))
            .await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().items.len(), 1);
    }
}
