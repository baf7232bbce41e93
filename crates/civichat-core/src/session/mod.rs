//! Session state: the active credential set and the contact it resolves to.
//!
//! [`Session`] is the single writer. Views and reconcilers get an
//! [`Arc<ActiveSession>`] handle at construction and never look the session
//! up ambiently. A login replaces the handle (and its gateway) wholesale;
//! holders of an old handle keep talking to the old gateway until rebuilt.

mod validation;

pub use validation::{ValidationError, ValidationResult, validate_credentials};

use std::sync::Arc;

use civichat_api::{ContactId, ContactSummary, Credentials};
use tracing::{debug, info, warn};

use crate::gateway::{CrmGateway, GatewayConnector};
use crate::vault::CredentialVault;
use crate::{Error, Result};

/// An authenticated session: credentials, resolved contact and the gateway
/// bound to those credentials.
pub struct ActiveSession {
    credentials: Credentials,
    contact: ContactSummary,
    gateway: Arc<dyn CrmGateway>,
}

impl ActiveSession {
    /// Credentials of this session.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The contact the session acts as.
    #[must_use]
    pub const fn contact(&self) -> &ContactSummary {
        &self.contact
    }

    /// Shortcut for the resolved contact's id.
    #[must_use]
    pub const fn contact_id(&self) -> &ContactId {
        &self.contact.id
    }

    /// Gateway bound to this session's credentials.
    #[must_use]
    pub fn gateway(&self) -> &dyn CrmGateway {
        self.gateway.as_ref()
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("credentials", &self.credentials)
            .field("contact", &self.contact)
            .finish_non_exhaustive()
    }
}

/// Holder of zero or one [`ActiveSession`].
pub struct Session {
    connector: Arc<dyn GatewayConnector>,
    vault: Arc<dyn CredentialVault>,
    active: Option<Arc<ActiveSession>>,
    last_error: Option<String>,
}

impl Session {
    /// Creates an unauthenticated session.
    #[must_use]
    pub fn new(connector: Arc<dyn GatewayConnector>, vault: Arc<dyn CredentialVault>) -> Self {
        Self {
            connector,
            vault,
            active: None,
            last_error: None,
        }
    }

    /// The active session, if logged in.
    #[must_use]
    pub fn active(&self) -> Option<Arc<ActiveSession>> {
        self.active.clone()
    }

    /// The active session, or `Error::NotAuthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAuthenticated` when nobody is logged in.
    pub fn require_active(&self) -> Result<Arc<ActiveSession>> {
        self.active().ok_or(Error::NotAuthenticated)
    }

    /// Whether the authenticated region is reachable.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    /// Message of the last failed login, cleared by a successful login or logout.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Logs in with `credentials`.
    ///
    /// On failure the previous session (if any) stays active, the failure
    /// message is recorded and the error returned.
    ///
    /// # Errors
    ///
    /// Returns a validation, transport, API or not-found error.
    pub async fn login(&mut self, credentials: Credentials) -> Result<Arc<ActiveSession>> {
        let active = match self.authenticate(credentials).await {
            Ok(active) => Arc::new(active),
            Err(e) => {
                warn!("Login failed: {e}");
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.persist(Some(active.credentials()));
        info!("Logged in as contact {}", active.contact_id());
        self.active = Some(Arc::clone(&active));
        self.last_error = None;
        Ok(active)
    }

    /// Logs out. Never fails; vault problems are only logged.
    pub fn logout(&mut self) {
        if let Some(active) = self.active.take() {
            info!("Logged out contact {}", active.contact_id());
        }
        self.last_error = None;
        self.persist(None);
    }

    /// Restores the session from the vault at startup.
    ///
    /// Any failure leaves the session unauthenticated and records nothing.
    pub async fn restore(&mut self) -> Option<Arc<ActiveSession>> {
        if !self.vault.is_available() {
            debug!("Credential vault unavailable, skipping restore");
            return None;
        }

        let credentials = match self.vault.load() {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return None,
            Err(e) => {
                warn!("Unable to read stored credentials: {e}");
                return None;
            }
        };

        match self.authenticate(credentials).await {
            Ok(active) => {
                let active = Arc::new(active);
                info!("Restored session for contact {}", active.contact_id());
                self.active = Some(Arc::clone(&active));
                Some(active)
            }
            Err(e) => {
                warn!("Unable to restore credentials: {e}");
                None
            }
        }
    }

    /// Builds a fresh gateway and resolves the credentials' contact.
    async fn authenticate(&self, credentials: Credentials) -> Result<ActiveSession> {
        validate_credentials(&credentials).map_err(Error::Validation)?;

        let gateway = self.connector.connect(&credentials)?;
        let contact = gateway.resolve_contact(&credentials.contact_id).await?;

        Ok(ActiveSession {
            credentials,
            contact,
            gateway,
        })
    }

    /// Saves (`Some`) or deletes (`None`) the stored credentials, best effort.
    fn persist(&self, credentials: Option<&Credentials>) {
        if !self.vault.is_available() {
            debug!("Credential vault unavailable, not persisting");
            return;
        }

        let result = match credentials {
            Some(credentials) => self.vault.save(credentials),
            None => self.vault.delete(),
        };
        if let Err(e) = result {
            warn!("Unable to update stored credentials: {e}");
        }
    }
}
