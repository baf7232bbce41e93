//! HTTP client for the CiviCRM APIv3 REST endpoint.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::response::{ApiResponse, id_string};
use crate::types::{
    ContactId, ContactSummary, Credentials, GroupId, GroupMessage, GroupSummary, SendAck,
};
use crate::{ACTIVITY_TYPE, MESSAGE_LIMIT, SUBJECT_MAX_CHARS};

/// Default path of the REST endpoint below the site URL.
pub const DEFAULT_REST_PATH: &str = "civicrm/ajax/rest";

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Path of the REST endpoint below the site URL.
    pub rest_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            rest_path: DEFAULT_REST_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ContactRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembershipRow {
    #[serde(deserialize_with = "id_string")]
    group_id: String,
    #[serde(default)]
    group_title: Option<String>,
    #[serde(default)]
    group_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    #[serde(deserialize_with = "id_string")]
    contact_id: String,
}

#[derive(Debug, Deserialize)]
struct ActivityRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    activity_date_time: String,
    #[serde(deserialize_with = "id_string")]
    source_contact_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
}

/// CiviCRM client bound to one credential set.
///
/// Contact summaries are cached for the lifetime of the client, so author
/// names are looked up at most once per session.
#[derive(Debug)]
pub struct CiviClient {
    credentials: Credentials,
    endpoint: Url,
    http_client: Client,
    contact_cache: Mutex<HashMap<ContactId, ContactSummary>>,
}

impl CiviClient {
    /// Creates a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the site URL is invalid or the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(credentials, &ClientConfig::default())
    }

    /// Creates a client with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the site URL is invalid or the HTTP client cannot be built.
    pub fn with_config(credentials: Credentials, config: &ClientConfig) -> Result<Self> {
        let endpoint = rest_endpoint(&credentials.site_url, &config.rest_path)?;
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            credentials,
            endpoint,
            http_client,
            contact_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Credentials this client acts with.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Full URL of the REST endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(&self, entity: &str, action: &str, params: Value) -> Result<ApiResponse> {
        let json = request_json(&self.credentials, params);
        debug!("CiviCRM {entity}.{action}");

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .form(&[("entity", entity), ("action", action), ("json", json.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        ApiResponse::parse(&body)
    }

    /// Resolves a contact's summary, using the per-client cache.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no contact matches, or a transport/API error.
    pub async fn resolve_contact(&self, contact_id: &ContactId) -> Result<ContactSummary> {
        if let Some(summary) = self.contact_cache.lock().await.get(contact_id) {
            return Ok(summary.clone());
        }

        let response = self
            .request(
                "Contact",
                "get",
                json!({ "id": contact_id.as_str(), "return": ["display_name", "email"] }),
            )
            .await?;

        let summary = response
            .rows::<ContactRow>()?
            .into_iter()
            .next()
            .map(contact_from_row)
            .ok_or_else(|| Error::not_found("Contact", contact_id.as_str()))?;

        self.contact_cache
            .lock()
            .await
            .insert(contact_id.clone(), summary.clone());
        Ok(summary)
    }

    /// Looks up the first contact with the given email.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error.
    pub async fn find_contact_by_email(&self, email: &str) -> Result<Option<ContactSummary>> {
        let response = self
            .request(
                "Contact",
                "get",
                json!({
                    "email": email,
                    "return": ["display_name", "email"],
                    "options": { "limit": 1 },
                }),
            )
            .await?;

        let found = response
            .rows::<ContactRow>()?
            .into_iter()
            .next()
            .map(contact_from_row);

        if let Some(summary) = &found {
            self.contact_cache
                .lock()
                .await
                .insert(summary.id.clone(), summary.clone());
        }
        Ok(found)
    }

    /// Lists the groups a contact currently belongs to, in CRM order.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error.
    pub async fn list_group_membership(&self, contact_id: &ContactId) -> Result<Vec<GroupSummary>> {
        let response = self
            .request(
                "GroupContact",
                "get",
                json!({
                    "contact_id": contact_id.as_str(),
                    "status": "Added",
                    "return": ["group_id", "group_title", "group_description"],
                }),
            )
            .await?;

        Ok(response
            .rows::<MembershipRow>()?
            .into_iter()
            .map(group_from_row)
            .collect())
    }

    /// Lists current member ids of a group.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error.
    pub async fn list_group_members(&self, group_id: &GroupId) -> Result<Vec<ContactId>> {
        let response = self
            .request(
                "GroupContact",
                "get",
                json!({
                    "group_id": group_id.as_str(),
                    "status": "Added",
                    "return": ["contact_id"],
                }),
            )
            .await?;

        Ok(response
            .rows::<MemberRow>()?
            .into_iter()
            .map(|row| ContactId(row.contact_id))
            .collect())
    }

    /// Lists the most recent messages of a group, oldest first.
    ///
    /// Author names are left empty.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error.
    pub async fn list_group_messages(&self, group_id: &GroupId) -> Result<Vec<GroupMessage>> {
        let response = self
            .request(
                "Activity",
                "get",
                json!({
                    "source_record_id": group_id.as_str(),
                    "source_record_table": "civicrm_group",
                    "activity_type_id": ACTIVITY_TYPE,
                    "return": ["id", "details", "subject", "activity_date_time", "source_contact_id"],
                    "options": { "sort": "activity_date_time DESC", "limit": MESSAGE_LIMIT },
                }),
            )
            .await?;

        Ok(messages_oldest_first(response.rows::<ActivityRow>()?))
    }

    /// Creates one message activity in the group.
    ///
    /// # Errors
    ///
    /// Returns a transport or API error.
    pub async fn send_message(
        &self,
        group_id: &GroupId,
        text: &str,
        recipients: &[ContactId],
    ) -> Result<SendAck> {
        let response = self
            .request(
                "Activity",
                "create",
                send_params(&self.credentials.contact_id, group_id, text, recipients),
            )
            .await?;

        let activity_id = response
            .rows::<CreatedRow>()
            .ok()
            .and_then(|rows| rows.into_iter().next())
            .map(|row| row.id);
        Ok(SendAck { activity_id })
    }
}

/// Builds the endpoint URL from a site URL with or without trailing slash.
fn rest_endpoint(site_url: &str, rest_path: &str) -> Result<Url> {
    let base = site_url.trim().trim_end_matches('/');
    Url::parse(&format!("{base}/{}", rest_path.trim_start_matches('/'))).map_err(Into::into)
}

/// Serializes the `json` form field: auth keys plus call parameters.
fn request_json(credentials: &Credentials, params: Value) -> String {
    let mut object = Map::new();
    object.insert("sequential".to_string(), json!(1));
    object.insert("api_key".to_string(), json!(credentials.api_key));
    object.insert("key".to_string(), json!(credentials.site_key));
    if let Value::Object(params) = params {
        object.extend(params);
    }
    Value::Object(object).to_string()
}

fn send_params(sender: &ContactId, group_id: &GroupId, text: &str, recipients: &[ContactId]) -> Value {
    let mut params = json!({
        "source_contact_id": sender.as_str(),
        "source_record_id": group_id.as_str(),
        "source_record_table": "civicrm_group",
        "activity_type_id": ACTIVITY_TYPE,
        "subject": truncate_subject(text),
        "details": text,
    });
    if !recipients.is_empty()
        && let Value::Object(map) = &mut params
    {
        let joined = recipients
            .iter()
            .map(ContactId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        map.insert("target_contact_id".to_string(), Value::String(joined));
    }
    params
}

/// First `SUBJECT_MAX_CHARS` characters of a message.
pub(crate) fn truncate_subject(text: &str) -> String {
    text.chars().take(SUBJECT_MAX_CHARS).collect()
}

fn contact_from_row(row: ContactRow) -> ContactSummary {
    ContactSummary {
        id: ContactId(row.id),
        display_name: row.display_name.unwrap_or_default(),
        email: row.email.filter(|e| !e.is_empty()),
    }
}

fn group_from_row(row: MembershipRow) -> GroupSummary {
    let id = GroupId(row.group_id);
    let title = row
        .group_title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| GroupSummary::fallback_title(&id));
    GroupSummary {
        id,
        title,
        description: row.group_description.filter(|d| !d.is_empty()),
    }
}

/// Rows arrive newest first (so the limit keeps the latest); flip them.
fn messages_oldest_first(rows: Vec<ActivityRow>) -> Vec<GroupMessage> {
    rows.into_iter()
        .rev()
        .map(|row| GroupMessage {
            id: row.id,
            author_id: ContactId(row.source_contact_id),
            author_name: String::new(),
            details: row.details.unwrap_or_default(),
            subject: row.subject.filter(|s| !s.is_empty()),
            timestamp: row.activity_date_time,
        })
        .collect()
}
