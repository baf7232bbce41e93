//! Cache data models.

use std::fmt;

use chrono::{DateTime, Utc};
use civichat_api::{ContactId, GroupId};

/// Prefix of every group-list snapshot scope.
pub const GROUPS_PREFIX: &str = "civi.offline.groups.";

/// Prefix of every message-list snapshot scope.
pub const MESSAGES_PREFIX: &str = "civi.offline.messages.";

/// Scope a snapshot is stored under.
///
/// Every scope embeds the owning contact, so snapshots never leak between
/// contacts sharing a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    /// Group list of a contact.
    Groups {
        /// Owning contact.
        contact: ContactId,
    },
    /// Message list of one group, as seen by a contact.
    Messages {
        /// Owning contact.
        contact: ContactId,
        /// Group the messages belong to.
        group: GroupId,
    },
}

impl SnapshotKey {
    /// Scope for a contact's group list.
    #[must_use]
    pub fn groups(contact: &ContactId) -> Self {
        Self::Groups {
            contact: contact.clone(),
        }
    }

    /// Scope for a group's message list.
    #[must_use]
    pub fn messages(contact: &ContactId, group: &GroupId) -> Self {
        Self::Messages {
            contact: contact.clone(),
            group: group.clone(),
        }
    }

    /// Storage key for this scope.
    #[must_use]
    pub fn scope(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Groups { contact } => write!(f, "{GROUPS_PREFIX}{contact}"),
            Self::Messages { contact, group } => write!(f, "{MESSAGES_PREFIX}{contact}.{group}"),
        }
    }
}

/// A persisted payload with the time it was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord<T> {
    /// The snapshot itself.
    pub payload: T,
    /// When the snapshot was written.
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_strings() {
        let contact = ContactId::new("C1");
        assert_eq!(SnapshotKey::groups(&contact).scope(), "civi.offline.groups.C1");
        assert_eq!(
            SnapshotKey::messages(&contact, &GroupId::new("5")).scope(),
            "civi.offline.messages.C1.5"
        );
    }

    #[test]
    fn test_scopes_embed_contact() {
        let group = GroupId::new("5");
        let a = SnapshotKey::messages(&ContactId::new("1"), &group);
        let b = SnapshotKey::messages(&ContactId::new("2"), &group);
        assert_ne!(a.scope(), b.scope());
        assert_ne!(
            SnapshotKey::groups(&ContactId::new("1")).scope(),
            SnapshotKey::groups(&ContactId::new("2")).scope()
        );
    }
}
