//! Durable credential storage.
//!
//! The session persists the active credential set so it can be restored on
//! the next start. Storage may not exist on every platform; callers check
//! [`CredentialVault::is_available`] and skip persistence when it is false.

mod system;
mod memory;

pub use self::system::KeyringVault;
pub use self::memory::MemoryVault;

use civichat_api::Credentials;

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Stored credentials could not be encoded or decoded.
    #[error("Stored credentials are unreadable: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The vault is not usable on this platform.
    #[error("Credential storage is unavailable")]
    Unavailable,
}

/// Result type for credential operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// Secure storage for at most one credential set.
pub trait CredentialVault: Send + Sync {
    /// Whether the vault can be used at all.
    fn is_available(&self) -> bool;

    /// Stores `credentials`, replacing anything stored before.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn save(&self, credentials: &Credentials) -> VaultResult<()>;

    /// Loads the stored credentials, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored value is unreadable.
    fn load(&self) -> VaultResult<Option<Credentials>>;

    /// Deletes the stored credentials. Deleting nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    fn delete(&self) -> VaultResult<()>;
}
