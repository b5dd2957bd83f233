//! Per-profile credential selection.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::tunnel::error::TunnelError;
use crate::tunnel::profile::ConnectionProfile;

use super::traits::AuthStrategy;
use super::{KeyAuth, PasswordAuth};

/// Which authentication method a profile uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Key,
    Password,
}

impl AuthMode {
    /// Key-based when both the key file and its passphrase are non-empty,
    /// password-based otherwise.
    pub fn select(profile: &ConnectionProfile) -> Self {
        if !profile.key_file.is_empty() && !profile.key_passphrase.is_empty() {
            AuthMode::Key
        } else {
            AuthMode::Password
        }
    }
}

/// Exactly one authentication method, ready for the transport.
pub enum Credential {
    Key(KeyAuth),
    Password(PasswordAuth),
}

impl Credential {
    pub fn mode(&self) -> AuthMode {
        match self {
            Credential::Key(_) => AuthMode::Key,
            Credential::Password(_) => AuthMode::Password,
        }
    }

    pub fn strategy(&self) -> &dyn AuthStrategy {
        match self {
            Credential::Key(key) => key,
            Credential::Password(password) => password,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Key(key) => f
                .debug_tuple("Key")
                .field(&key.key_path().display())
                .finish(),
            Credential::Password(_) => f.debug_tuple("Password").field(&"***").finish(),
        }
    }
}

/// Turns a profile's authentication material into a [`Credential`].
#[derive(Debug, Clone)]
pub struct Authenticator {
    base_dir: PathBuf,
}

impl Authenticator {
    /// `base_dir` is the directory relative key file paths are resolved against.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Absolute key paths are used unchanged.
    pub fn resolve_key_path(&self, key_file: &str) -> PathBuf {
        self.base_dir.join(Path::new(key_file))
    }

    /// Build the credential for `profile`.
    ///
    /// A profile with neither key material nor password still gets a password
    /// credential with an empty secret; a warning is logged for it.
    pub fn credential_for(&self, profile: &ConnectionProfile) -> Result<Credential, TunnelError> {
        if profile.username.is_empty() {
            return Err(TunnelError::Credential("username is required".to_string()));
        }

        match AuthMode::select(profile) {
            AuthMode::Key => {
                let path = self.resolve_key_path(&profile.key_file);
                Ok(Credential::Key(KeyAuth::load(path, &profile.key_passphrase)?))
            }
            AuthMode::Password => {
                let password = PasswordAuth::new(profile.password.clone());
                if password.is_empty() {
                    warn!(
                        "Profile {} has no key passphrase and no password, attempting password authentication with an empty secret",
                        profile.name
                    );
                }
                Ok(Credential::Password(password))
            }
        }
    }
}
