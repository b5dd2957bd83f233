//! SSH session handles.
//!
//! The orchestrator only sees the [`Transport`] and [`SessionHandle`] traits;
//! [`RusshTransport`] is the production implementation.
//!
//! # Architecture
//!
//! - `SshClientHandler`: A russh client handler that accepts all host keys
//!   (similar to `StrictHostKeyChecking=no` in OpenSSH) and logs the server
//!   fingerprint.
//! - `RusshSession`: Owns the `client::Handle` behind an `Arc<Mutex<_>>`, shared
//!   with the accept loops of its forwards.

use std::sync::Arc;

use async_trait::async_trait;
use russh::{Disconnect, client, keys};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::tunnel::auth::Credential;
use crate::tunnel::client::connect_authenticated;
use crate::tunnel::config::TunnelSettings;
use crate::tunnel::error::TunnelError;
use crate::tunnel::forward::{Forward, SshForward};
use crate::tunnel::profile::{ForwardBinding, SessionTarget};

/// Client handler for russh that accepts all host keys.
pub struct SshClientHandler {
    server: String,
}

impl SshClientHandler {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            server: format!("{}:{}", host, port),
        }
    }
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        info!(
            "{} host key fingerprint {}",
            self.server,
            server_public_key.fingerprint(Default::default())
        );
        Ok(true)
    }
}

/// Creates sessions. One per profile.
#[cfg_attr(test, automock)]
pub trait Transport: Send + Sync {
    fn new_session(&self, target: SessionTarget, credential: Credential) -> Box<dyn SessionHandle>;
}

/// One secure session and the forwards bound to it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Establish and authenticate the session. Blocks on network I/O.
    async fn connect(&mut self) -> Result<(), TunnelError>;

    fn is_connected(&self) -> bool;

    /// Close the session. A no-op when not connected.
    async fn disconnect(&mut self) -> Result<(), TunnelError>;

    /// Create a forward over this session. The forward is not started.
    async fn add_forward(
        &mut self,
        binding: ForwardBinding,
    ) -> Result<Box<dyn Forward>, TunnelError>;
}

/// [`Transport`] backed by russh.
pub struct RusshTransport {
    settings: TunnelSettings,
}

impl RusshTransport {
    pub fn new(settings: TunnelSettings) -> Self {
        Self { settings }
    }
}

impl Transport for RusshTransport {
    fn new_session(
        &self,
        target: SessionTarget,
        credential: Credential,
    ) -> Box<dyn SessionHandle> {
        Box::new(RusshSession {
            target,
            credential,
            settings: self.settings.clone(),
            handle: None,
        })
    }
}

pub struct RusshSession {
    target: SessionTarget,
    credential: Credential,
    settings: TunnelSettings,
    handle: Option<Arc<Mutex<client::Handle<SshClientHandler>>>>,
}

impl RusshSession {
    /// A handle locked by a forward opening a channel is in use, so it counts
    /// as live.
    fn live_handle(&self) -> Option<&Arc<Mutex<client::Handle<SshClientHandler>>>> {
        self.handle.as_ref().filter(|handle| {
            handle
                .try_lock()
                .map(|handle| !handle.is_closed())
                .unwrap_or(true)
        })
    }
}

#[async_trait]
impl SessionHandle for RusshSession {
    async fn connect(&mut self) -> Result<(), TunnelError> {
        if self.live_handle().is_some() {
            return Ok(());
        }

        let handle = connect_authenticated(&self.target, &self.credential, &self.settings).await?;
        self.handle = Some(Arc::new(Mutex::new(handle)));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.live_handle().is_some()
    }

    async fn disconnect(&mut self) -> Result<(), TunnelError> {
        let Some(handle_arc) = self.handle.take() else {
            return Ok(());
        };

        let handle = handle_arc.lock().await;
        if handle.is_closed() {
            debug!("Session {} already closed", self.target);
            return Ok(());
        }

        handle
            .disconnect(Disconnect::ByApplication, "Tunnel closed", "en")
            .await
            .map_err(|e| TunnelError::Disconnect(format!("{}: {}", self.target, e)))
    }

    async fn add_forward(
        &mut self,
        binding: ForwardBinding,
    ) -> Result<Box<dyn Forward>, TunnelError> {
        let handle = self.live_handle().cloned().ok_or_else(|| {
            TunnelError::Forward(format!("session {} is not connected", self.target))
        })?;

        Ok(Box::new(SshForward::new(handle, binding)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunnel::auth::PasswordAuth;

    fn unconnected_session() -> Box<dyn SessionHandle> {
        let transport = RusshTransport::new(TunnelSettings::default());
        transport.new_session(
            SessionTarget {
                host: "127.0.0.1".to_string(),
                port: 22,
                username: "deploy".to_string(),
            },
            Credential::Password(PasswordAuth::new("pw")),
        )
    }

    fn binding() -> ForwardBinding {
        ForwardBinding {
            local_host: "127.0.0.1".to_string(),
            local_port: 0,
            remote_host: "10.0.0.2".to_string(),
            remote_port: 80,
        }
    }

    #[test]
    fn test_new_session_is_not_connected() {
        assert!(!unconnected_session().is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_noop() {
        let mut session = unconnected_session();
        assert!(session.disconnect().await.is_ok());
        assert!(session.disconnect().await.is_ok());
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_forward_requires_connected_session() {
        let mut session = unconnected_session();
        let err = session.add_forward(binding()).await.err().unwrap();
        assert!(matches!(err, TunnelError::Forward(_)));
    }

    #[test]
    fn test_handler_names_server() {
        let handler = SshClientHandler::new("bastion.example.com", 2222);
        assert_eq!(handler.server, "bastion.example.com:2222");
    }
}
