use async_trait::async_trait;
use russh::client;

use crate::tunnel::session::SshClientHandler;

/// One way of proving a profile's identity to the server.
///
/// A strategy runs once, right after the handshake, on the session it belongs to.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// `Ok(false)` means the server said no. `Err` means the exchange itself
    /// broke; the message ends up in the profile's connect error.
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String>;

    /// Short label for logs and rejection messages, e.g. `"password"`.
    fn name(&self) -> &'static str;
}
