//! Private key file SSH authentication.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use russh::{client, keys};
use tracing::debug;

use crate::tunnel::error::TunnelError;
use crate::tunnel::session::SshClientHandler;

use super::traits::AuthStrategy;

/// Private key authentication strategy.
///
/// The key is decrypted when the strategy is built, so an unreadable or
/// wrongly-protected key fails before any network traffic.
pub struct KeyAuth {
    key_path: PathBuf,
    key: Arc<keys::PrivateKey>,
}

impl KeyAuth {
    /// Load and decrypt the private key at `key_path`.
    pub fn load(key_path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, TunnelError> {
        let key_path = key_path.into();

        if !key_path.is_file() {
            return Err(TunnelError::Credential(format!(
                "key file {} not found",
                key_path.display()
            )));
        }

        let passphrase = (!passphrase.is_empty()).then_some(passphrase);
        let key = keys::load_secret_key(&key_path, passphrase).map_err(|e| {
            TunnelError::Credential(format!(
                "failed to load private key from {}: {}",
                key_path.display(),
                e
            ))
        })?;

        Ok(Self {
            key_path,
            key: Arc::new(key),
        })
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

#[async_trait]
impl AuthStrategy for KeyAuth {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        // For RSA keys, use the best supported hash algorithm
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        debug!("Using RSA hash algorithm for key auth: {:?}", hash_alg);

        let key_with_hash = keys::PrivateKeyWithHashAlg::new(self.key.clone(), hash_alg);

        let result = handle
            .authenticate_publickey(username, key_with_hash)
            .await
            .map_err(|e| format!("Key authentication failed: {}", e))?;

        Ok(result.success())
    }

    fn name(&self) -> &'static str {
        "key"
    }
}
