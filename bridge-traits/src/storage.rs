//! Secure Credential Storage Abstraction
//!
//! Abstracts the platform's secure storage mechanism:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service / libsecret
//! - Test harnesses: in-memory map
//!
//! # Security Requirements
//!
//! Implementations MUST:
//! - Encrypt data at rest
//! - Use platform-provided secure storage when available
//! - Never log or expose sensitive data

use async_trait::async_trait;

use crate::error::Result;

/// Secure credential storage trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn persist(store: &dyn SecureStore, payload: &[u8]) -> Result<()> {
///     store.set_secret("portal_session", payload).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value
    ///
    /// # Security
    ///
    /// - Value is encrypted before storage
    /// - Previous value is securely erased if it exists
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist. Returned data should be
    /// handled securely and not logged.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret
    ///
    /// Idempotent: deleting a missing key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}
