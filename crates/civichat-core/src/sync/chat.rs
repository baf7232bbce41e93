//! Group conversation view.
//!
//! Messages follow the shared cache-then-refresh cycle. Members are
//! fetched alongside them and only feed the recipient list, so a failed
//! member lookup never blocks the conversation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use civichat_api::{ContactId, GroupMessage, GroupSummary};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::generation::GenerationCounter;
use super::reconciler::{Reconciler, RefreshOutcome};
use super::view::ViewState;
use crate::cache::{SnapshotKey, SnapshotRepository};
use crate::session::ActiveSession;
use crate::{Error, Result};

/// Reconciles one group's messages for the session's contact.
#[derive(Debug)]
pub struct GroupChatReconciler {
    session: Arc<ActiveSession>,
    group: GroupSummary,
    core: Reconciler<GroupMessage>,
    members: watch::Sender<BTreeSet<ContactId>>,
    member_generations: GenerationCounter,
    draft: watch::Sender<String>,
    sending: AtomicBool,
}

impl GroupChatReconciler {
    /// Creates the conversation view of `group`.
    #[must_use]
    pub fn new(session: Arc<ActiveSession>, group: GroupSummary, store: SnapshotRepository) -> Self {
        let key = SnapshotKey::messages(session.contact_id(), &group.id);
        let (members, _) = watch::channel(BTreeSet::new());
        let (draft, _) = watch::channel(String::new());
        Self {
            session,
            group,
            core: Reconciler::new(key, store),
            members,
            member_generations: GenerationCounter::new(),
            draft,
            sending: AtomicBool::new(false),
        }
    }

    /// The group this conversation belongs to.
    #[must_use]
    pub const fn group(&self) -> &GroupSummary {
        &self.group
    }

    /// Current view state.
    #[must_use]
    pub fn state(&self) -> ViewState<GroupMessage> {
        self.core.state()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState<GroupMessage>> {
        self.core.subscribe()
    }

    /// Initial load: snapshot first, then messages and members concurrently.
    ///
    /// Loading ends once both fetches have settled.
    pub async fn open(&self) -> RefreshOutcome {
        self.core.load_snapshot().await;
        self.core.set_loading(true);
        let (outcome, ()) = tokio::join!(self.load_messages(), self.load_members());
        self.core.set_loading(false);
        outcome
    }

    /// Pull-to-refresh of messages and members.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.core.set_refreshing(true);
        let (outcome, ()) = tokio::join!(self.load_messages(), self.load_members());
        self.core.set_refreshing(false);
        outcome
    }

    /// Replaces the composer text.
    pub fn set_draft(&self, text: impl Into<String>) {
        self.draft.send_replace(text.into());
    }

    /// Current composer text.
    #[must_use]
    pub fn draft(&self) -> String {
        self.draft.borrow().clone()
    }

    /// Whether a send is running.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Known member ids of the group.
    #[must_use]
    pub fn members(&self) -> BTreeSet<ContactId> {
        self.members.borrow().clone()
    }

    /// Members a new message is addressed to: everyone but the sender.
    #[must_use]
    pub fn recipients(&self) -> Vec<ContactId> {
        let me = self.session.contact_id();
        self.members
            .borrow()
            .iter()
            .filter(|id| *id != me)
            .cloned()
            .collect()
    }

    /// Whether `message` was written by the session's contact.
    #[must_use]
    pub fn is_own_message(&self, message: &GroupMessage) -> bool {
        &message.author_id == self.session.contact_id()
    }

    /// Sends the draft, then reloads the conversation.
    ///
    /// The sent message only appears once the reload returns it. The draft
    /// is cleared on success and kept on failure.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyDraft` for a blank draft, `Error::SendInProgress`
    /// while another send runs, or the gateway error of a failed send.
    pub async fn send(&self) -> Result<RefreshOutcome> {
        let text = self.draft.borrow().trim().to_string();
        if text.is_empty() {
            return Err(Error::EmptyDraft);
        }
        if self.sending.swap(true, Ordering::AcqRel) {
            return Err(Error::SendInProgress);
        }

        let result = self.deliver(&text).await;
        self.sending.store(false, Ordering::Release);
        result
    }

    /// Tears the view down; fetches still in flight are discarded.
    pub fn close(&self) {
        self.core.close();
        self.member_generations.close();
    }

    async fn deliver(&self, text: &str) -> Result<RefreshOutcome> {
        let recipients = self.recipients();
        let sent = self
            .session
            .gateway()
            .send_message(&self.group.id, text, &recipients)
            .await;

        match sent {
            Ok(ack) => {
                info!(
                    "Sent message to group {} ({} recipients, activity {:?})",
                    self.group.id,
                    recipients.len(),
                    ack.activity_id
                );
                self.draft.send_replace(String::new());
                Ok(self.load_messages().await)
            }
            Err(e) => {
                warn!("Sending to group {} failed: {e}", self.group.id);
                self.core.set_error(Some(e.to_string()));
                Err(e.into())
            }
        }
    }

    async fn load_messages(&self) -> RefreshOutcome {
        let token = self.core.begin_fetch();
        let gateway = self.session.gateway();
        let result = match gateway.list_group_messages(&self.group.id).await {
            Ok(messages) => Ok(gateway.hydrate_author_names(messages).await),
            Err(e) => Err(e),
        };
        self.core.settle(token, result).await
    }

    async fn load_members(&self) {
        let token = self.member_generations.next();
        match self.session.gateway().list_group_members(&self.group.id).await {
            Ok(ids) if self.member_generations.is_current(token) => {
                let members: BTreeSet<ContactId> = ids.into_iter().collect();
                debug!("Group {} has {} members", self.group.id, members.len());
                self.members.send_replace(members);
            }
            Ok(_) => debug!("Discarding superseded member list for {}", self.group.id),
            Err(e) => warn!("Unable to load members of group {}: {e}", self.group.id),
        }
    }
}
