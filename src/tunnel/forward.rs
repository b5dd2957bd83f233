//! Local port forwarding over an SSH session.
//!
//! Uses the `direct-tcpip` channel type defined in RFC 4254.
//!
//! # Architecture
//!
//! 1. **TCP Listener**: Bound on `local_host:local_port` when the forward is
//!    started. Binding happens inline so a port already in use fails the
//!    profile instead of a background task.
//!
//! 2. **Accept Loop**: A spawned task accepts clients until the forward is
//!    stopped or the listener fails.
//!
//! 3. **Bidirectional I/O**: Each client gets its own `direct-tcpip` channel
//!    to `remote_host:remote_port`. Data flows in both directions with
//!    `tokio::io::copy`, and `tokio::select!` ends the relay when either side
//!    closes.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[cfg(test)]
use mockall::automock;

use crate::tunnel::error::TunnelError;
use crate::tunnel::profile::ForwardBinding;
use crate::tunnel::session::SshClientHandler;

/// A local listener relaying to a remote destination over a session.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Forward: Send + Sync {
    /// Bind the local listener and begin relaying.
    ///
    /// Returns the bound address, which differs from the binding when the
    /// configured local port is 0.
    async fn start(&mut self) -> Result<SocketAddr, TunnelError>;

    /// Stop accepting new clients. Relays already running end with the session.
    fn stop(&mut self);

    /// `None` until started.
    fn local_addr(&self) -> Option<SocketAddr>;

    fn binding(&self) -> ForwardBinding;
}

/// Bind the local side of `binding`.
pub(crate) async fn bind_listener(binding: &ForwardBinding) -> Result<TcpListener, TunnelError> {
    TcpListener::bind((binding.local_host.as_str(), binding.local_port))
        .await
        .map_err(|e| TunnelError::Forward(format!("Failed to bind to {}: {}", binding.local(), e)))
}

/// [`Forward`] over a russh session.
pub struct SshForward {
    handle: Arc<Mutex<client::Handle<SshClientHandler>>>,
    binding: ForwardBinding,
    local_addr: Option<SocketAddr>,
    accept_task: Option<JoinHandle<()>>,
}

impl SshForward {
    pub(crate) fn new(
        handle: Arc<Mutex<client::Handle<SshClientHandler>>>,
        binding: ForwardBinding,
    ) -> Self {
        Self {
            handle,
            binding,
            local_addr: None,
            accept_task: None,
        }
    }
}

#[async_trait]
impl Forward for SshForward {
    async fn start(&mut self) -> Result<SocketAddr, TunnelError> {
        if let Some(addr) = self.local_addr {
            return Ok(addr);
        }

        let listener = bind_listener(&self.binding).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TunnelError::Forward(format!("Failed to get local address: {}", e)))?;

        let handle = self.handle.clone();
        let remote_host = self.binding.remote_host.clone();
        let remote_port = self.binding.remote_port;

        let accept_task = tokio::spawn(async move {
            debug!("Port forwarding active on {}", local_addr);

            loop {
                match listener.accept().await {
                    Ok((local_stream, client_addr)) => {
                        debug!("New connection from {} to forwarded port", client_addr);

                        let handle = handle.clone();
                        let remote_host = remote_host.clone();

                        tokio::spawn(async move {
                            if let Err(e) = relay_connection(
                                handle,
                                local_stream,
                                client_addr,
                                &remote_host,
                                remote_port,
                            )
                            .await
                            {
                                debug!("Port forwarding connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection on {}: {}", local_addr, e);
                        break;
                    }
                }
            }
        });

        info!("Forwarding {} -> {}", local_addr, self.binding.remote());
        self.local_addr = Some(local_addr);
        self.accept_task = Some(accept_task);
        Ok(local_addr)
    }

    fn stop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn binding(&self) -> ForwardBinding {
        self.binding.clone()
    }
}

impl Drop for SshForward {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Relay one accepted client over a fresh `direct-tcpip` channel.
async fn relay_connection(
    handle_arc: Arc<Mutex<client::Handle<SshClientHandler>>>,
    local_stream: TcpStream,
    client_addr: SocketAddr,
    remote_host: &str,
    remote_port: u16,
) -> Result<(), String> {
    let handle = handle_arc.lock().await;
    let channel = handle
        .channel_open_direct_tcpip(
            remote_host,
            remote_port as u32,
            client_addr.ip().to_string(),
            client_addr.port() as u32,
        )
        .await
        .map_err(|e| {
            format!(
                "Failed to open direct-tcpip channel to {}:{}: {}",
                remote_host, remote_port, e
            )
        })?;
    drop(handle);

    let channel_stream = channel.into_stream();

    let (mut local_read, mut local_write) = tokio::io::split(local_stream);
    let (mut channel_read, mut channel_write) = tokio::io::split(channel_stream);

    let local_to_remote = tokio::io::copy(&mut local_read, &mut channel_write);
    let remote_to_local = tokio::io::copy(&mut channel_read, &mut local_write);

    tokio::select! {
        result = local_to_remote => {
            if let Err(e) = result {
                debug!("Local to remote copy ended: {}", e);
            }
        }
        result = remote_to_local => {
            if let Err(e) = result {
                debug!("Remote to local copy ended: {}", e);
            }
        }
    }

    debug!("Port forwarding connection from {} closed", client_addr);
    Ok(())
}
