//! Domain types exchanged with the CRM.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a CRM contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub String);

impl ContactId {
    /// Create a new contact ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContactId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContactId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of a CRM group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    /// Create a new group ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Metadata from an external identity provider used to find the contact.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    /// Provider name (e.g. `microsoft`).
    pub provider: String,
    /// Opaque access token issued by the provider.
    pub token: String,
    /// When the token expires, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Display name reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl IdentityMetadata {
    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(60) >= exp)
    }
}

impl fmt::Debug for IdentityMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMetadata")
            .field("provider", &self.provider)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("name", &self.name)
            .field("email", &self.email)
            .finish()
    }
}

/// Everything needed to call the CRM on behalf of one contact.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Base URL of the CiviCRM site.
    pub site_url: String,
    /// The contact's API key.
    pub api_key: String,
    /// The site key.
    pub site_key: String,
    /// Contact the session acts as.
    pub contact_id: ContactId,
    /// Identity provider metadata, when sign-in went through one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityMetadata>,
}

impl Credentials {
    /// Creates credentials without identity provider metadata.
    #[must_use]
    pub fn new(
        site_url: impl Into<String>,
        api_key: impl Into<String>,
        site_key: impl Into<String>,
        contact_id: impl Into<ContactId>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            api_key: api_key.into(),
            site_key: site_key.into(),
            contact_id: contact_id.into(),
            identity: None,
        }
    }

    /// Attaches identity provider metadata.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityMetadata) -> Self {
        self.identity = Some(identity);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("site_url", &self.site_url)
            .field("api_key", &"<redacted>")
            .field("site_key", &"<redacted>")
            .field("contact_id", &self.contact_id)
            .field("identity", &self.identity)
            .finish()
    }
}

/// A contact's identity as shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    /// Contact ID.
    pub id: ContactId,
    /// Display name.
    pub display_name: String,
    /// Primary email, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A group the contact belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group ID.
    pub id: GroupId,
    /// Group title.
    pub title: String,
    /// Group description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupSummary {
    /// Creates a group summary without a description.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(id),
            title: title.into(),
            description: None,
        }
    }

    /// Title used when the CRM does not report one.
    #[must_use]
    pub fn fallback_title(id: &GroupId) -> String {
        format!("Group {id}")
    }
}

/// One message in a group conversation (a `Text Message` activity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Activity ID.
    pub id: String,
    /// Contact who wrote the message.
    pub author_id: ContactId,
    /// Author display name; empty until hydrated.
    #[serde(default)]
    pub author_name: String,
    /// Message body.
    pub details: String,
    /// Activity subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Activity date/time as reported by the CRM (sortable).
    pub timestamp: String,
}

/// Acknowledgement of a created message activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendAck {
    /// ID of the created activity, when the CRM returned one.
    pub activity_id: Option<String>,
}
