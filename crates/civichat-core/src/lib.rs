//! # civichat-core
//!
//! Offline-aware core of the `civichat` CiviCRM group messaging client.
//!
//! This crate provides:
//! - Session state with credential validation and restore
//! - Durable credential storage (system keyring)
//! - Local snapshot store (`SQLite`) for groups and messages
//! - Cache-then-refresh reconcilers for the group list and group chat
//! - The [`CrmGateway`] seam over the CiviCRM client

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
mod error;
pub mod gateway;
pub mod session;
pub mod sync;
pub mod vault;

pub use cache::{CacheRecord, SnapshotKey, SnapshotRepository};
pub use error::{Error, ErrorKind, Result};
pub use gateway::{CiviConnector, CrmGateway, GatewayConnector, UNKNOWN_CONTACT};
pub use session::{ActiveSession, Session, ValidationError, ValidationResult, validate_credentials};
pub use sync::{GroupChatReconciler, GroupListReconciler, Phase, RefreshOutcome, ViewState};
pub use vault::{CredentialVault, KeyringVault, MemoryVault, VaultError, VaultResult};
