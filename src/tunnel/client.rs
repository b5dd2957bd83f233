//! SSH client connection and authentication logic.
//!
//! ## Connection Lifecycle
//!
//! 1. **Client Configuration**: Build the russh client configuration with
//!    keepalive and compression settings. Tunnel sessions are long-lived, so
//!    there is no inactivity timeout.
//!
//! 2. **Connection Establishment**: TCP connect and SSH handshake.
//!
//! 3. **Authentication**: Authenticate with the profile's [`Credential`].
//!
//! Steps 2 and 3 together are bounded by the connect timeout. There are no
//! retries: a failed profile stays down for the rest of the run.

use std::sync::Arc;

use russh::client;
use tracing::info;

use crate::tunnel::auth::Credential;
use crate::tunnel::config::{KEEPALIVE_MAX, TunnelSettings};
use crate::tunnel::error::TunnelError;
use crate::tunnel::profile::SessionTarget;
use crate::tunnel::session::SshClientHandler;

/// Build russh client configuration from the run settings.
pub(crate) fn build_client_config(settings: &TunnelSettings) -> Arc<client::Config> {
    let compression = if settings.compression {
        (&[russh::compression::ZLIB, russh::compression::NONE][..]).into()
    } else {
        (&[russh::compression::NONE][..]).into()
    };

    let preferred = russh::Preferred {
        compression,
        ..Default::default()
    };

    Arc::new(client::Config {
        inactivity_timeout: None,
        keepalive_interval: settings.keepalive,
        keepalive_max: KEEPALIVE_MAX,
        preferred,
        ..Default::default()
    })
}

/// Connect to `target` and authenticate with `credential`.
pub(crate) async fn connect_authenticated(
    target: &SessionTarget,
    credential: &Credential,
    settings: &TunnelSettings,
) -> Result<client::Handle<SshClientHandler>, TunnelError> {
    let timeout = settings.connect_timeout;

    tokio::time::timeout(timeout, open_session(target, credential, settings))
        .await
        .map_err(|_| TunnelError::connect(format!("Connection timed out after {:?}", timeout)))?
}

async fn open_session(
    target: &SessionTarget,
    credential: &Credential,
    settings: &TunnelSettings,
) -> Result<client::Handle<SshClientHandler>, TunnelError> {
    let config = build_client_config(settings);
    let handler = SshClientHandler::new(&target.host, target.port);

    let mut handle = client::connect(config, (target.host.as_str(), target.port), handler)
        .await
        .map_err(|e| TunnelError::connect(format!("Failed to connect: {}", e)))?;

    let strategy = credential.strategy();
    let success = strategy
        .authenticate(&mut handle, &target.username)
        .await
        .map_err(|e| TunnelError::connect(e))?;

    if !success {
        return Err(TunnelError::connect(format!(
            "{} authentication rejected for {}",
            strategy.name(),
            target.username
        )));
    }

    info!("Authenticated {} with {} authentication", target, strategy.name());
    Ok(handle)
}
