//! SSH tunnel orchestration.
//!
//! This module is organized into the following submodules:
//!
//! - `profile`: Connection profiles and value coercion
//! - `source`: Profile file loading
//! - `config`: Runtime settings with environment variable support
//! - `error`: Error types and connect failure classification
//! - `auth`: Per-profile authentication selection
//! - `client`: SSH connection and authentication logic
//! - `session`: Transport and session handle traits with the russh implementation
//! - `forward`: Local port forwarding over a session
//! - `registry`: Live registry of established tunnels
//! - `orchestrator`: Establishes tunnels profile by profile
//! - `shutdown`: Termination signal handling
//! - `supervisor`: Establish, wait for shutdown, tear down

pub mod auth;
pub(crate) mod client;
pub mod config;
pub mod error;
pub mod forward;
pub mod orchestrator;
pub mod profile;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod source;
pub mod supervisor;

pub use config::TunnelSettings;
pub use error::{ConnectFailure, TunnelError};
pub use orchestrator::{ProfileOutcome, TunnelOrchestrator};
pub use profile::ConnectionProfile;
pub use registry::{SessionRegistry, TeardownSummary};
pub use session::{RusshTransport, SessionHandle, Transport};
pub use shutdown::ShutdownCoordinator;
