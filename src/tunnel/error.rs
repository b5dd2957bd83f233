//! Error types for tunnel establishment and teardown.
//!
//! Every variant except [`TunnelError::Source`] is recovered locally: a failing
//! profile or registry entry is reported with its name and the run continues.
//!
//! # Connect Failure Classification
//!
//! The transport reports connection problems as free-form messages. They are
//! classified so the console line says what kind of problem happened:
//!
//! 1. **Authentication**: the server rejected the credential. Checked first, so
//!    a message mentioning both a timeout and a rejected key is an auth problem.
//! 2. **Network**: refused, reset, timed out, unreachable.
//! 3. **Protocol**: anything else (key exchange, version negotiation, ...).

use std::fmt;

use thiserror::Error;

/// Authentication failure patterns.
const AUTH_ERRORS: &[&str] = &[
    "authentication failed",
    "authentication rejected",
    "password authentication failed",
    "key authentication failed",
    "permission denied",
    "publickey",
    "auth fail",
    "no authentication",
    "all authentication methods failed",
];

/// Network failure patterns.
const NETWORK_ERRORS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "timed out",
    "timeout",
    "network is unreachable",
    "no route to host",
    "host is down",
    "temporary failure",
    "failed to lookup address",
    "name or service not known",
    "resource temporarily unavailable",
    "failed to connect",
    "broken pipe",
];

/// Why a session could not be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    Authentication,
    Network,
    Protocol,
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectFailure::Authentication => write!(f, "authentication rejected"),
            ConnectFailure::Network => write!(f, "host unreachable"),
            ConnectFailure::Protocol => write!(f, "protocol negotiation failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TunnelError {
    /// A profile value could not be coerced to its expected type.
    #[error("invalid value for `{key}`: {reason}")]
    Profile { key: &'static str, reason: String },
    /// Authentication material is missing, unreadable or rejected by the key parser.
    #[error("credential error: {0}")]
    Credential(String),
    #[error("{kind}: {message}")]
    Connect {
        kind: ConnectFailure,
        message: String,
    },
    #[error("forward error: {0}")]
    Forward(String),
    #[error("disconnect error: {0}")]
    Disconnect(String),
    /// The profile file itself is unusable. The only fatal error.
    #[error("configuration error: {0}")]
    Source(String),
}

impl TunnelError {
    /// Build a [`TunnelError::Connect`], classifying the transport message.
    pub fn connect(message: impl Into<String>) -> Self {
        let message = message.into();
        TunnelError::Connect {
            kind: classify_connect_failure(&message),
            message,
        }
    }

    pub(crate) fn profile(key: &'static str, reason: impl Into<String>) -> Self {
        TunnelError::Profile {
            key,
            reason: reason.into(),
        }
    }
}

/// Classifies a transport error message.
///
/// Authentication patterns take precedence over network patterns; messages
/// matching neither are treated as protocol failures.
pub(crate) fn classify_connect_failure(message: &str) -> ConnectFailure {
    let lower = message.to_lowercase();

    if AUTH_ERRORS.iter().any(|pattern| lower.contains(pattern)) {
        return ConnectFailure::Authentication;
    }

    if NETWORK_ERRORS.iter().any(|pattern| lower.contains(pattern)) {
        return ConnectFailure::Network;
    }

    ConnectFailure::Protocol
}

#[cfg(test)]
mod tests {
    use super::*;

    mod authentication {
        use super::*;

        #[test]
        fn test_authentication_failed() {
            assert_eq!(
                classify_connect_failure("Authentication failed"),
                ConnectFailure::Authentication
            );
            assert_eq!(
                classify_connect_failure("AUTHENTICATION FAILED"),
                ConnectFailure::Authentication
            );
        }

        #[test]
        fn test_permission_denied() {
            assert_eq!(
                classify_connect_failure("permission denied (publickey)"),
                ConnectFailure::Authentication
            );
        }

        #[test]
        fn test_rejected_credential() {
            assert_eq!(
                classify_connect_failure("password authentication rejected by server"),
                ConnectFailure::Authentication
            );
        }

        #[test]
        fn test_auth_takes_priority_over_network() {
            assert_eq!(
                classify_connect_failure("Connection timeout during authentication failed"),
                ConnectFailure::Authentication
            );
        }
    }

    mod network {
        use super::*;

        #[test]
        fn test_connection_refused() {
            assert_eq!(
                classify_connect_failure("Connection refused (os error 111)"),
                ConnectFailure::Network
            );
        }

        #[test]
        fn test_timed_out() {
            assert_eq!(
                classify_connect_failure("Connection timed out after 30s"),
                ConnectFailure::Network
            );
        }

        #[test]
        fn test_unreachable() {
            assert_eq!(
                classify_connect_failure("Network is unreachable"),
                ConnectFailure::Network
            );
            assert_eq!(
                classify_connect_failure("No route to host"),
                ConnectFailure::Network
            );
        }

        #[test]
        fn test_dns_failure() {
            assert_eq!(
                classify_connect_failure(
                    "failed to lookup address information: Name or service not known"
                ),
                ConnectFailure::Network
            );
        }
    }

    mod protocol {
        use super::*;

        #[test]
        fn test_unknown_message_is_protocol() {
            assert_eq!(
                classify_connect_failure("No common key exchange algorithm"),
                ConnectFailure::Protocol
            );
        }

        #[test]
        fn test_empty_message_is_protocol() {
            assert_eq!(classify_connect_failure(""), ConnectFailure::Protocol);
        }
    }

    mod display {
        use super::*;

        #[test]
        fn test_connect_error_message_includes_kind() {
            let err = TunnelError::connect("Connection refused");
            assert_eq!(err.to_string(), "host unreachable: Connection refused");
        }

        #[test]
        fn test_profile_error_names_key() {
            let err = TunnelError::profile("localport", "`abc` is not a port number");
            assert_eq!(
                err.to_string(),
                "invalid value for `localport`: `abc` is not a port number"
            );
        }

        #[test]
        fn test_credential_error() {
            let err = TunnelError::Credential("key file keys/id_rsa not found".to_string());
            assert_eq!(
                err.to_string(),
                "credential error: key file keys/id_rsa not found"
            );
        }
    }
}
