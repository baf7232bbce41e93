//! Group list view.

use std::sync::Arc;

use civichat_api::GroupSummary;
use tokio::sync::watch;

use super::reconciler::{Reconciler, RefreshOutcome};
use super::view::ViewState;
use crate::cache::{SnapshotKey, SnapshotRepository};
use crate::session::ActiveSession;

/// Reconciles the groups of the session's contact.
#[derive(Debug)]
pub struct GroupListReconciler {
    session: Arc<ActiveSession>,
    core: Reconciler<GroupSummary>,
}

impl GroupListReconciler {
    /// Creates the view for `session`'s contact.
    #[must_use]
    pub fn new(session: Arc<ActiveSession>, store: SnapshotRepository) -> Self {
        let key = SnapshotKey::groups(session.contact_id());
        Self {
            session,
            core: Reconciler::new(key, store),
        }
    }

    /// Current view state.
    #[must_use]
    pub fn state(&self) -> ViewState<GroupSummary> {
        self.core.state()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState<GroupSummary>> {
        self.core.subscribe()
    }

    /// Initial load: snapshot first, then the remote fetch.
    pub async fn open(&self) -> RefreshOutcome {
        self.core.load_snapshot().await;
        self.core.set_loading(true);
        let outcome = self.fetch().await;
        self.core.set_loading(false);
        outcome
    }

    /// Pull-to-refresh. The snapshot is not re-read.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.core.set_refreshing(true);
        let outcome = self.fetch().await;
        self.core.set_refreshing(false);
        outcome
    }

    /// Tears the view down; fetches still in flight are discarded.
    pub fn close(&self) {
        self.core.close();
    }

    async fn fetch(&self) -> RefreshOutcome {
        let token = self.core.begin_fetch();
        let result = self
            .session
            .gateway()
            .list_group_membership(self.session.contact_id())
            .await;
        self.core.settle(token, result).await
    }
}
