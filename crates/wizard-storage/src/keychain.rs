//! OS Keychain-backed secret vault.
//!
//! Uses the platform-native secure storage:
//! - Windows: Credential Manager
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Each secret is one keychain entry addressed by the composite
//! `(owner_id, scope_id, key)` account name. The returned reference is
//! what callers embed in saved configurations in place of the plaintext.

use anyhow::{Context, Result};
use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, info};
use zeroize::Zeroizing;

use wizard_core::branding;
use wizard_core::repository::{RepoResult, SecretVault};

/// Keychain-based implementation of `SecretVault`.
pub struct KeychainSecretVault {
    service: String,
}

impl KeychainSecretVault {
    pub fn new() -> Self {
        Self {
            service: branding::KEYCHAIN_SERVICE.to_string(),
        }
    }

    /// Create with a custom keychain service name (for testing).
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn account(owner_id: &str, scope_id: &str, key: &str) -> String {
        format!("{}:{}:{}", owner_id, scope_id, key)
    }

    fn entry(&self, account: &str) -> Result<Entry> {
        Entry::new(&self.service, account).context("Failed to create keychain entry")
    }
}

impl Default for KeychainSecretVault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretVault for KeychainSecretVault {
    async fn store(
        &self,
        owner_id: &str,
        scope_id: &str,
        key: &str,
        plaintext: &str,
        label: &str,
    ) -> RepoResult<String> {
        let account = Self::account(owner_id, scope_id, key);
        self.entry(&account)?
            .set_password(plaintext)
            .with_context(|| format!("Failed to store secret {}", account))?;

        info!("Stored secret {} ({})", account, label);
        Ok(format!("keychain:{}", account))
    }

    async fn retrieve(
        &self,
        owner_id: &str,
        scope_id: &str,
        key: &str,
    ) -> RepoResult<Option<Zeroizing<String>>> {
        let account = Self::account(owner_id, scope_id, key);
        match self.entry(&account)?.get_password() {
            Ok(plaintext) => Ok(Some(Zeroizing::new(plaintext))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to access keychain: {}", e)),
        }
    }

    async fn delete(&self, owner_id: &str, scope_id: &str, key: &str) -> RepoResult<bool> {
        let account = Self::account(owner_id, scope_id, key);
        match self.entry(&account)?.delete_credential() {
            Ok(()) => {
                info!("Deleted secret {}", account);
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No secret to delete at {}", account);
                Ok(false)
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to delete secret from keychain: {}",
                e
            )),
        }
    }
}
