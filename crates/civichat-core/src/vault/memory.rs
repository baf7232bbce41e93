//! In-process vault.

use std::sync::{Mutex, PoisonError};

use civichat_api::Credentials;

use super::{CredentialVault, VaultError, VaultResult};

/// Vault that keeps credentials in memory only.
///
/// An unavailable instance models a device without secure storage: it
/// reports `is_available() == false` and rejects every operation.
#[derive(Debug, Default)]
pub struct MemoryVault {
    unavailable: bool,
    stored: Mutex<Option<Credentials>>,
}

impl MemoryVault {
    /// Creates an empty, available vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vault that reports itself unavailable.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            stored: Mutex::new(None),
        }
    }

    /// Creates an available vault already holding `credentials`.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            unavailable: false,
            stored: Mutex::new(Some(credentials)),
        }
    }

    fn slot(&self) -> VaultResult<std::sync::MutexGuard<'_, Option<Credentials>>> {
        if self.unavailable {
            return Err(VaultError::Unavailable);
        }
        Ok(self.stored.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl CredentialVault for MemoryVault {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn save(&self, credentials: &Credentials) -> VaultResult<()> {
        *self.slot()? = Some(credentials.clone());
        Ok(())
    }

    fn load(&self) -> VaultResult<Option<Credentials>> {
        Ok(self.slot()?.clone())
    }

    fn delete(&self) -> VaultResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}
