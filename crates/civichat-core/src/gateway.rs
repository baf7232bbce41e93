//! Seam between the core and the remote CRM.
//!
//! Reconcilers and the session only see [`CrmGateway`], so the HTTP client
//! can be swapped for a scripted one in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use civichat_api::{
    CiviClient, ClientConfig, ContactId, ContactSummary, Credentials, GroupId, GroupMessage,
    GroupSummary, SendAck,
};
use futures::future::join_all;
use tracing::warn;

/// Author name shown when a contact lookup fails.
pub const UNKNOWN_CONTACT: &str = "Unknown contact";

/// Remote operations the core depends on.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// Resolves a contact's summary.
    async fn resolve_contact(&self, contact_id: &ContactId) -> civichat_api::Result<ContactSummary>;

    /// Lists the groups a contact belongs to, in CRM order.
    async fn list_group_membership(
        &self,
        contact_id: &ContactId,
    ) -> civichat_api::Result<Vec<GroupSummary>>;

    /// Lists member ids of a group.
    async fn list_group_members(&self, group_id: &GroupId) -> civichat_api::Result<Vec<ContactId>>;

    /// Lists a group's messages, oldest first, with empty author names.
    async fn list_group_messages(
        &self,
        group_id: &GroupId,
    ) -> civichat_api::Result<Vec<GroupMessage>>;

    /// Creates one message in a group.
    async fn send_message(
        &self,
        group_id: &GroupId,
        text: &str,
        recipients: &[ContactId],
    ) -> civichat_api::Result<SendAck>;

    /// Fills in author names, resolving each distinct author once.
    ///
    /// Authors whose lookup fails are named [`UNKNOWN_CONTACT`]. Message
    /// order is unchanged.
    async fn hydrate_author_names(&self, messages: Vec<GroupMessage>) -> Vec<GroupMessage> {
        let mut seen = HashSet::new();
        let authors: Vec<ContactId> = messages
            .iter()
            .filter(|m| seen.insert(&m.author_id))
            .map(|m| m.author_id.clone())
            .collect();

        let lookups = authors.into_iter().map(|author| async move {
            let name = match self.resolve_contact(&author).await {
                Ok(summary) => summary.display_name,
                Err(e) => {
                    warn!("Unable to fetch contact summary for {author}: {e}");
                    UNKNOWN_CONTACT.to_string()
                }
            };
            (author, name)
        });
        let names: HashMap<ContactId, String> = join_all(lookups).await.into_iter().collect();

        messages
            .into_iter()
            .map(|mut message| {
                if let Some(name) = names.get(&message.author_id) {
                    message.author_name.clone_from(name);
                }
                message
            })
            .collect()
    }
}

#[async_trait]
impl CrmGateway for CiviClient {
    async fn resolve_contact(&self, contact_id: &ContactId) -> civichat_api::Result<ContactSummary> {
        Self::resolve_contact(self, contact_id).await
    }

    async fn list_group_membership(
        &self,
        contact_id: &ContactId,
    ) -> civichat_api::Result<Vec<GroupSummary>> {
        Self::list_group_membership(self, contact_id).await
    }

    async fn list_group_members(&self, group_id: &GroupId) -> civichat_api::Result<Vec<ContactId>> {
        Self::list_group_members(self, group_id).await
    }

    async fn list_group_messages(
        &self,
        group_id: &GroupId,
    ) -> civichat_api::Result<Vec<GroupMessage>> {
        Self::list_group_messages(self, group_id).await
    }

    async fn send_message(
        &self,
        group_id: &GroupId,
        text: &str,
        recipients: &[ContactId],
    ) -> civichat_api::Result<SendAck> {
        Self::send_message(self, group_id, text, recipients).await
    }
}

/// Builds one gateway per credential set.
pub trait GatewayConnector: Send + Sync {
    /// Creates a gateway bound to `credentials`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot produce a client (e.g. bad site URL).
    fn connect(&self, credentials: &Credentials) -> civichat_api::Result<Arc<dyn CrmGateway>>;
}

/// Connector producing HTTP [`CiviClient`]s.
#[derive(Debug, Clone, Default)]
pub struct CiviConnector {
    config: ClientConfig,
}

impl CiviConnector {
    /// Creates a connector with the given client settings.
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl GatewayConnector for CiviConnector {
    fn connect(&self, credentials: &Credentials) -> civichat_api::Result<Arc<dyn CrmGateway>> {
        let client = CiviClient::with_config(credentials.clone(), &self.config)?;
        Ok(Arc::new(client))
    }
}
