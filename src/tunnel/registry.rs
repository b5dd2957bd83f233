//! Live registry of established tunnels.
//!
//! The registry is owned by the orchestrator and only reached through `&mut`,
//! so entries cannot be appended while teardown iterates them.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::tunnel::error::TunnelError;
use crate::tunnel::forward::Forward;
use crate::tunnel::session::SessionHandle;

/// One connected session and the forward started over it.
pub struct RegistryEntry {
    profile_name: String,
    session: Box<dyn SessionHandle>,
    forward: Box<dyn Forward>,
    connected_at: String,
    local_addr: Option<SocketAddr>,
}

impl RegistryEntry {
    pub fn info(&self) -> EntryInfo {
        let binding = self.forward.binding();
        EntryInfo {
            profile_name: self.profile_name.clone(),
            connected_at: self.connected_at.clone(),
            local_addr: self
                .local_addr
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| binding.local()),
            remote_addr: binding.remote(),
            connected: self.session.is_connected(),
        }
    }
}

/// Read-only view of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub profile_name: String,
    /// RFC3339 timestamp of registration
    pub connected_at: String,
    pub local_addr: String,
    pub remote_addr: String,
    pub connected: bool,
}

/// Outcome counts of one [`SessionRegistry::disconnect_all`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeardownSummary {
    pub disconnected: usize,
    pub already_closed: usize,
    pub failed: usize,
}

impl TeardownSummary {
    pub fn total(&self) -> usize {
        self.disconnected + self.already_closed + self.failed
    }
}

/// Established tunnels, in registration order.
pub struct SessionRegistry {
    entries: Vec<RegistryEntry>,
    disconnect_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(disconnect_timeout: Duration) -> Self {
        Self {
            entries: Vec::new(),
            disconnect_timeout,
        }
    }

    /// Record a tunnel whose session is connected and whose forward started.
    pub fn register(
        &mut self,
        profile_name: impl Into<String>,
        session: Box<dyn SessionHandle>,
        forward: Box<dyn Forward>,
    ) {
        let profile_name = profile_name.into();
        let local_addr = forward.local_addr();
        debug!("Registering tunnel {}", profile_name);

        self.entries.push(RegistryEntry {
            profile_name,
            session,
            forward,
            connected_at: Utc::now().to_rfc3339(),
            local_addr,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, profile_name: &str) -> bool {
        self.entries.iter().any(|e| e.profile_name == profile_name)
    }

    pub fn entries(&self) -> Vec<EntryInfo> {
        self.entries.iter().map(RegistryEntry::info).collect()
    }

    /// Stop every forward and disconnect every session that is still
    /// connected.
    ///
    /// Entries are handled one by one and a failure never stops the rest.
    /// The registry is empty afterwards, so calling this again does nothing.
    pub async fn disconnect_all(&mut self) -> TeardownSummary {
        let mut summary = TeardownSummary::default();

        for mut entry in self.entries.drain(..) {
            entry.forward.stop();

            if !entry.session.is_connected() {
                debug!("Session {} already closed", entry.profile_name);
                summary.already_closed += 1;
                continue;
            }

            let result =
                tokio::time::timeout(self.disconnect_timeout, entry.session.disconnect())
                    .await
                    .unwrap_or_else(|_| {
                        Err(TunnelError::Disconnect(format!(
                            "timed out after {:?}",
                            self.disconnect_timeout
                        )))
                    });

            match result {
                Ok(()) => {
                    info!("Disconnected {}", entry.profile_name);
                    summary.disconnected += 1;
                }
                Err(e) => {
                    warn!("Failed to disconnect {}: {}", entry.profile_name, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
