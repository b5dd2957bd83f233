//! Turns profiles into live tunnels.
//!
//! Profiles are attempted one at a time, in the order given. Any error while
//! establishing a profile is captured in its [`ProfileOutcome`] and the next
//! profile is attempted as if nothing happened.

use std::fmt;
use std::net::SocketAddr;

use tracing::{debug, info, warn};

use crate::tunnel::auth::Authenticator;
use crate::tunnel::error::TunnelError;
use crate::tunnel::profile::ConnectionProfile;
use crate::tunnel::registry::{SessionRegistry, TeardownSummary};
use crate::tunnel::session::{SessionHandle, Transport};
use crate::tunnel::source::{ProfileEntry, RejectedProfile};

/// Result of attempting one enabled profile.
#[derive(Debug)]
pub enum ProfileOutcome {
    /// Session connected, forward started and registered.
    Connected { name: String, local_addr: SocketAddr },
    /// The transport returned without error but the session is not up.
    NotConnected { name: String },
    Failed { name: String, error: TunnelError },
}

impl ProfileOutcome {
    pub fn name(&self) -> &str {
        match self {
            ProfileOutcome::Connected { name, .. }
            | ProfileOutcome::NotConnected { name }
            | ProfileOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ProfileOutcome::Connected { .. })
    }
}

/// The console line for this outcome.
impl fmt::Display for ProfileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileOutcome::Connected { name, .. } => {
                write!(f, "connection {} has connected", name)
            }
            ProfileOutcome::NotConnected { name } => {
                write!(f, "connection {} has not connected", name)
            }
            ProfileOutcome::Failed { name, error } => {
                write!(
                    f,
                    "Error with connection {}! Full error details: {}",
                    name, error
                )
            }
        }
    }
}

/// Establishes tunnels and owns the registry of the ones that came up.
pub struct TunnelOrchestrator<T: Transport> {
    transport: T,
    authenticator: Authenticator,
    registry: SessionRegistry,
}

impl<T: Transport> TunnelOrchestrator<T> {
    pub fn new(transport: T, authenticator: Authenticator, registry: SessionRegistry) -> Self {
        Self {
            transport,
            authenticator,
            registry,
        }
    }

    /// Attempt every enabled profile in order.
    ///
    /// Disabled profiles produce no outcome.
    pub async fn establish_all(&mut self, profiles: &[ConnectionProfile]) -> Vec<ProfileOutcome> {
        let mut outcomes = Vec::new();
        for profile in profiles {
            if let Some(outcome) = self.establish_profile(profile).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Attempt one entry of the profile file.
    ///
    /// A rejected entry is reported as failed without touching the transport.
    pub async fn establish_entry(&mut self, entry: ProfileEntry) -> Option<ProfileOutcome> {
        match entry {
            ProfileEntry::Valid(profile) => self.establish_profile(&profile).await,
            ProfileEntry::Rejected(RejectedProfile { name, error }) => {
                warn!("Profile {} rejected: {}", name, error);
                Some(ProfileOutcome::Failed { name, error })
            }
        }
    }

    /// Attempt a single profile. `None` when the profile is disabled.
    pub async fn establish_profile(
        &mut self,
        profile: &ConnectionProfile,
    ) -> Option<ProfileOutcome> {
        if !profile.enabled {
            debug!("Skipping disabled profile {}", profile.name);
            return None;
        }

        let name = profile.name.clone();
        let outcome = match self.try_establish(profile).await {
            Ok(Some(local_addr)) => {
                info!(
                    "Tunnel {} up: {} -> {} via {}",
                    name,
                    local_addr,
                    profile.forward_binding().remote(),
                    profile.session_target()
                );
                ProfileOutcome::Connected { name, local_addr }
            }
            Ok(None) => {
                warn!("Tunnel {} did not connect", name);
                ProfileOutcome::NotConnected { name }
            }
            Err(error) => {
                warn!("Tunnel {} failed: {}", name, error);
                ProfileOutcome::Failed { name, error }
            }
        };
        Some(outcome)
    }

    async fn try_establish(
        &mut self,
        profile: &ConnectionProfile,
    ) -> Result<Option<SocketAddr>, TunnelError> {
        let credential = self.authenticator.credential_for(profile)?;
        debug!("Profile {} uses {:?}", profile.name, credential.mode());

        let mut session = self
            .transport
            .new_session(profile.session_target(), credential);
        session.connect().await?;

        if !session.is_connected() {
            release(&profile.name, session.as_mut()).await;
            return Ok(None);
        }

        let started = async {
            let mut forward = session.add_forward(profile.forward_binding()).await?;
            let local_addr = forward.start().await?;
            Ok::<_, TunnelError>((forward, local_addr))
        }
        .await;

        match started {
            Ok((forward, local_addr)) => {
                self.registry.register(profile.name.as_str(), session, forward);
                Ok(Some(local_addr))
            }
            Err(e) => {
                release(&profile.name, session.as_mut()).await;
                Err(e)
            }
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Tear down every registered tunnel. Safe to call more than once.
    pub async fn disconnect_all(&mut self) -> TeardownSummary {
        self.registry.disconnect_all().await
    }
}

/// Disconnect a session that will not be registered.
async fn release(name: &str, session: &mut dyn SessionHandle) {
    if let Err(e) = session.disconnect().await {
        debug!("Failed to release session {}: {}", name, e);
    }
}
