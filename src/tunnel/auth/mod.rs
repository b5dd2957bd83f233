//! Authentication strategies for SSH connections.
//!
//! Each profile resolves to exactly one strategy:
//!
//! - [`KeyAuth`]: Private key file, decrypted with the profile's passphrase
//! - [`PasswordAuth`]: Password-based authentication
//!
//! [`Authenticator`] makes the choice and wraps it in a [`Credential`].

mod credential;
pub(crate) mod key;
mod password;
mod traits;

pub use credential::{AuthMode, Authenticator, Credential};
pub use key::KeyAuth;
pub use password::PasswordAuth;
pub use traits::AuthStrategy;
