//! Cache-then-refresh reconciliation of the group list and group chat views.
//!
//! Each view shows its last snapshot immediately, always follows up with a
//! remote fetch, replaces the whole collection on success and keeps what it
//! had on failure. Sent messages appear only through a reload.

mod chat;
mod generation;
mod groups;
mod reconciler;
mod view;

pub use chat::GroupChatReconciler;
pub use generation::{Generation, GenerationCounter};
pub use groups::GroupListReconciler;
pub use reconciler::{Reconciler, RefreshOutcome};
pub use view::{Phase, ViewState};
