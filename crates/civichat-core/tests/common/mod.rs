//! Scripted CRM gateway shared by the integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use civichat_api::{
    ContactId, ContactSummary, Credentials, GroupId, GroupMessage, GroupSummary, SendAck,
};
use civichat_core::{
    ActiveSession, CrmGateway, GatewayConnector, MemoryVault, Session, SnapshotRepository,
};
use tokio::sync::Notify;

/// Parks one gateway call until the test releases it.
#[derive(Debug, Default)]
pub struct Hold {
    entered: Notify,
    release: Notify,
}

impl Hold {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Waits until the held call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the held call return.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn park(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// What the fake CRM answers, plus a record of what it was asked.
#[derive(Debug, Default)]
pub struct Script {
    pub contacts: HashMap<ContactId, ContactSummary>,
    pub groups: Vec<GroupSummary>,
    pub members: Vec<ContactId>,
    pub messages: Vec<GroupMessage>,

    pub fail_groups: bool,
    pub fail_members: bool,
    pub fail_messages: bool,
    pub fail_send: bool,
    /// A successful send makes every later message fetch fail.
    pub fail_messages_after_send: bool,
    /// A successful send does not show up in later fetches.
    pub drop_sent: bool,

    /// The next membership call waits on this.
    pub hold_groups: Option<Arc<Hold>>,
    /// The next message call waits on this.
    pub hold_messages: Option<Arc<Hold>>,

    pub calls: Vec<&'static str>,
    pub sent: Vec<(GroupId, String, Vec<ContactId>)>,
}

impl Script {
    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.iter().filter(|call| **call == name).count()
    }
}

#[derive(Debug, Default)]
pub struct FakeGateway {
    script: Mutex<Script>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A gateway that knows Ada (C1), Grace (C2) and Alan (C3).
    pub fn with_people() -> Arc<Self> {
        let gateway = Self::new();
        {
            let mut script = gateway.script();
            for (id, name) in [("C1", "Ada"), ("C2", "Grace"), ("C3", "Alan")] {
                script.contacts.insert(
                    ContactId::new(id),
                    ContactSummary {
                        id: ContactId::new(id),
                        display_name: name.to_string(),
                        email: None,
                    },
                );
            }
        }
        gateway
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

fn unavailable() -> civichat_api::Error {
    civichat_api::Error::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[async_trait]
impl CrmGateway for FakeGateway {
    async fn resolve_contact(&self, contact_id: &ContactId) -> civichat_api::Result<ContactSummary> {
        let mut script = self.script();
        script.calls.push("resolve_contact");
        script
            .contacts
            .get(contact_id)
            .cloned()
            .ok_or_else(|| civichat_api::Error::not_found("Contact", contact_id.as_str()))
    }

    async fn list_group_membership(
        &self,
        _contact_id: &ContactId,
    ) -> civichat_api::Result<Vec<GroupSummary>> {
        let (response, hold) = {
            let mut script = self.script();
            script.calls.push("list_group_membership");
            let response = if script.fail_groups {
                Err(unavailable())
            } else {
                Ok(script.groups.clone())
            };
            (response, script.hold_groups.take())
        };
        if let Some(hold) = hold {
            hold.park().await;
        }
        response
    }

    async fn list_group_members(&self, _group_id: &GroupId) -> civichat_api::Result<Vec<ContactId>> {
        let mut script = self.script();
        script.calls.push("list_group_members");
        if script.fail_members {
            return Err(unavailable());
        }
        Ok(script.members.clone())
    }

    async fn list_group_messages(
        &self,
        _group_id: &GroupId,
    ) -> civichat_api::Result<Vec<GroupMessage>> {
        let (response, hold) = {
            let mut script = self.script();
            script.calls.push("list_group_messages");
            let response = if script.fail_messages {
                Err(unavailable())
            } else {
                // Names are filled in by hydration, never by the listing.
                Ok(script
                    .messages
                    .iter()
                    .cloned()
                    .map(|mut m| {
                        m.author_name.clear();
                        m
                    })
                    .collect())
            };
            (response, script.hold_messages.take())
        };
        if let Some(hold) = hold {
            hold.park().await;
        }
        response
    }

    async fn send_message(
        &self,
        group_id: &GroupId,
        text: &str,
        recipients: &[ContactId],
    ) -> civichat_api::Result<SendAck> {
        let mut script = self.script();
        script.calls.push("send_message");
        if script.fail_send {
            return Err(civichat_api::Error::api("Permission denied"));
        }

        script
            .sent
            .push((group_id.clone(), text.to_string(), recipients.to_vec()));
        let id = format!("a{}", 100 + script.sent.len());
        if !script.drop_sent {
            let timestamp = format!("2026-01-01 12:{:02}:00", script.messages.len());
            script.messages.push(GroupMessage {
                id: id.clone(),
                author_id: ContactId::new("C1"),
                author_name: String::new(),
                details: text.to_string(),
                subject: None,
                timestamp,
            });
        }
        if script.fail_messages_after_send {
            script.fail_messages = true;
        }
        Ok(SendAck {
            activity_id: Some(id),
        })
    }
}

/// Hands out the same fake gateway for every login.
#[derive(Debug)]
pub struct FakeConnector {
    gateway: Arc<FakeGateway>,
}

impl FakeConnector {
    pub fn new(gateway: Arc<FakeGateway>) -> Arc<Self> {
        Arc::new(Self { gateway })
    }
}

impl GatewayConnector for FakeConnector {
    fn connect(&self, _credentials: &Credentials) -> civichat_api::Result<Arc<dyn CrmGateway>> {
        Ok(Arc::clone(&self.gateway) as Arc<dyn CrmGateway>)
    }
}

pub fn credentials(contact: &str) -> Credentials {
    Credentials::new("https://crm.example.org", "api-key", "site-key", contact)
}

pub fn message(id: &str, author: &str, details: &str, timestamp: &str) -> GroupMessage {
    GroupMessage {
        id: id.to_string(),
        author_id: ContactId::new(author),
        author_name: String::new(),
        details: details.to_string(),
        subject: None,
        timestamp: timestamp.to_string(),
    }
}

/// Logs `contact` in against `gateway` with a throwaway vault.
pub async fn session_for(gateway: &Arc<FakeGateway>, contact: &str) -> Arc<ActiveSession> {
    let mut session = Session::new(
        FakeConnector::new(Arc::clone(gateway)),
        Arc::new(MemoryVault::new()),
    );
    session.login(credentials(contact)).await.unwrap()
}

pub async fn store() -> SnapshotRepository {
    SnapshotRepository::in_memory().await.unwrap()
}
