//! # civichat-api
//!
//! Client for the CiviCRM APIv3 REST endpoint (`civicrm/ajax/rest`), limited to
//! what group messaging needs.
//!
//! ## Features
//!
//! - **Contacts**: resolve a contact summary by id or by email, cached per client
//! - **Groups**: list a contact's groups and a group's members (status `Added`)
//! - **Messages**: list and create `Text Message` activities tagged to a group
//! - **Errors**: transport, CRM-reported and not-found failures kept distinct
//!
//! ## Quick Start
//!
//! ```ignore
//! use civichat_api::{CiviClient, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new("https://crm.example.org", "api-key", "site-key", "42");
//!     let client = CiviClient::new(credentials)?;
//!
//!     let me = client.resolve_contact(&"42".into()).await?;
//!     for group in client.list_group_membership(&me.id).await? {
//!         println!("{}: {}", group.id, group.title);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;
pub mod types;

pub use client::{CiviClient, ClientConfig, DEFAULT_REST_PATH};
pub use error::{Error, Result};
pub use types::{
    ContactId, ContactSummary, Credentials, GroupId, GroupMessage, GroupSummary, IdentityMetadata,
    SendAck,
};

/// Activity type used for group messages.
pub const ACTIVITY_TYPE: &str = "Text Message";

/// Maximum number of messages fetched per group.
pub const MESSAGE_LIMIT: u32 = 250;

/// Maximum length of a message activity's subject, in characters.
pub const SUBJECT_MAX_CHARS: usize = 60;
