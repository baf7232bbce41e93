//! Plain-text rendering of view state.

use std::fmt::Write as _;

use civichat_api::{GroupMessage, GroupSummary};
use civichat_core::ViewState;

/// Marker in front of messages written by the logged-in contact.
const OWN_MARKER: &str = "*";

/// One line per group: id, title and description when present.
pub fn groups(groups: &[GroupSummary]) -> String {
    if groups.is_empty() {
        return "No groups found.\n".to_string();
    }

    let width = groups.iter().map(|g| g.id.as_str().len()).max().unwrap_or(0);
    let mut out = String::new();
    for group in groups {
        let _ = write!(out, "{:>width$}  {}", group.id.as_str(), group.title);
        if let Some(description) = &group.description {
            let _ = write!(out, " - {description}");
        }
        out.push('\n');
    }
    out
}

/// One line per message, oldest first.
pub fn messages(messages: &[GroupMessage], is_own: impl Fn(&GroupMessage) -> bool) -> String {
    if messages.is_empty() {
        return "No messages yet.\n".to_string();
    }

    let mut out = String::new();
    for message in messages {
        let marker = if is_own(message) { OWN_MARKER } else { " " };
        let _ = writeln!(
            out,
            "{marker} [{}] {}: {}",
            message.timestamp, message.author_name, message.details
        );
    }
    out
}

/// Banner for a refresh that failed while older data stays visible.
pub fn stale_banner<T>(state: &ViewState<T>) -> Option<String> {
    state
        .error
        .as_ref()
        .filter(|_| state.has_data)
        .map(|error| format!("Showing saved data, refresh failed: {error}"))
}

#[cfg(test)]
mod tests {
    use civichat_api::ContactId;
    use civichat_core::Phase;

    use super::*;

    fn message(id: &str, author: &str, name: &str, details: &str) -> GroupMessage {
        GroupMessage {
            id: id.to_string(),
            author_id: ContactId::new(author),
            author_name: name.to_string(),
            details: details.to_string(),
            subject: None,
            timestamp: "2026-01-01 09:00:00".to_string(),
        }
    }

    #[test]
    fn test_groups_aligned_by_id() {
        let mut board = GroupSummary::new("12", "Board");
        board.description = Some("Trustees".to_string());
        let out = groups(&[GroupSummary::new("5", "Volunteers"), board]);
        assert_eq!(out, " 5  Volunteers\n12  Board - Trustees\n");
    }

    #[test]
    fn test_own_messages_marked() {
        let items = vec![
            message("a1", "C2", "Grace", "Hi all"),
            message("a2", "C1", "Ada", "Morning"),
        ];
        let me = ContactId::new("C1");
        let out = messages(&items, |m| m.author_id == me);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "  [2026-01-01 09:00:00] Grace: Hi all");
        assert_eq!(lines[1], "* [2026-01-01 09:00:00] Ada: Morning");
    }

    #[test]
    fn test_empty_lists() {
        assert_eq!(groups(&[]), "No groups found.\n");
        assert_eq!(messages(&[], |_| false), "No messages yet.\n");
    }

    #[test]
    fn test_banner_only_with_stale_data() {
        let mut state = ViewState::<GroupSummary> {
            error: Some("offline".to_string()),
            phase: Phase::RefreshFailed,
            ..ViewState::default()
        };
        assert!(stale_banner(&state).is_none());

        state.has_data = true;
        assert_eq!(
            stale_banner(&state).as_deref(),
            Some("Showing saved data, refresh failed: offline")
        );
    }
}
