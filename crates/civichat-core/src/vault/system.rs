//! Secure credential storage using system keyring.
//!
//! Provides secure storage for the session's credential set using the
//! platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use civichat_api::Credentials;
use keyring::Entry;
use tracing::{debug, warn};

use super::{CredentialVault, VaultResult};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "civichat";

/// Entry holding the serialized credential set.
const CREDENTIALS_ENTRY: &str = "civicrm.credentials";

/// Vault backed by the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
    entry: String,
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringVault {
    /// Creates a vault using the default service and entry names.
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(SERVICE_NAME, CREDENTIALS_ENTRY)
    }

    /// Creates a vault with explicit service and entry names.
    #[must_use]
    pub fn with_names(service: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entry: entry.into(),
        }
    }

    fn entry(&self) -> keyring::Result<Entry> {
        Entry::new(&self.service, &self.entry)
    }
}

impl CredentialVault for KeyringVault {
    fn is_available(&self) -> bool {
        let check = self.entry().and_then(|entry| entry.get_password());
        match check {
            Ok(_) | Err(keyring::Error::NoEntry) => true,
            Err(e) => {
                debug!("System keyring unavailable: {e}");
                false
            }
        }
    }

    fn save(&self, credentials: &Credentials) -> VaultResult<()> {
        let json = serde_json::to_string(credentials)?;
        self.entry()?.set_password(&json)?;
        debug!(
            "Stored credentials for contact {} in keyring",
            credentials.contact_id
        );
        Ok(())
    }

    fn load(&self) -> VaultResult<Option<Credentials>> {
        match self.entry()?.get_password() {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(keyring::Error::NoEntry) => {
                debug!("No stored credentials found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self) -> VaultResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                debug!("Deleted stored credentials");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No stored credentials to delete");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete stored credentials: {e}");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    // Note: These tests interact with the actual system keyring.
    // They are marked as ignored by default to avoid polluting the keyring
    // during automated testing. Run manually with `cargo test -- --ignored`

    use super::*;

    fn test_vault() -> KeyringVault {
        KeyringVault::with_names("civichat-test", "civicrm.credentials.test")
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve_credentials() {
        let vault = test_vault();
        let creds = Credentials::new("https://crm.example.org", "api", "site", "99999");

        vault.save(&creds).unwrap();
        assert_eq!(vault.load().unwrap(), Some(creds));

        vault.delete().unwrap();
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_delete_missing_is_ok() {
        let vault = test_vault();
        vault.delete().unwrap();
        vault.delete().unwrap();
        assert_eq!(vault.load().unwrap(), None);
    }
}
