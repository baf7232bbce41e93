//! Snapshot cache for offline support.
//!
//! This module persists the last successfully fetched group list and message
//! lists so they can be shown while the CRM is slow or unreachable.

mod model;
mod repository;

pub use model::{CacheRecord, GROUPS_PREFIX, MESSAGES_PREFIX, SnapshotKey};
pub use repository::SnapshotRepository;
