//! Connection profiles.
//!
//! A profile is one named forwarding intent plus its authentication material.
//! Profiles are read from the profile file as loosely-typed key/value tables
//! ([`RawProfile`]) and coerced into a [`ConnectionProfile`]:
//!
//! - `enabled` is a 0/1 integer (any non-zero value enables; TOML booleans work too)
//! - `sshport`, `localport`, `remoteport` are unsigned 16-bit integers
//! - everything else is a string; absent keys are the empty string

use std::fmt;

use serde::Deserialize;

use crate::tunnel::error::TunnelError;

/// Default SSH port when `sshport` is empty
pub(crate) const DEFAULT_SSH_PORT: u16 = 22;

/// Default local bind address when `localhost` is empty
pub(crate) const DEFAULT_LOCAL_HOST: &str = "127.0.0.1";

/// A scalar value as written in the profile file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    Float(f64),
}

impl RawValue {
    fn into_text(self) -> String {
        match self {
            RawValue::Text(text) => text,
            RawValue::Integer(value) => value.to_string(),
            RawValue::Flag(true) => "1".to_string(),
            RawValue::Flag(false) => "0".to_string(),
            RawValue::Float(value) => value.to_string(),
        }
    }
}

/// One profile table exactly as read from the profile file.
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawProfile {
    #[serde(default)]
    pub keyfile: Option<RawValue>,
    #[serde(default)]
    pub keypassphrase: Option<RawValue>,
    #[serde(default)]
    pub password: Option<RawValue>,
    #[serde(default)]
    pub username: Option<RawValue>,
    #[serde(default)]
    pub host: Option<RawValue>,
    #[serde(default)]
    pub sshport: Option<RawValue>,
    #[serde(default)]
    pub localhost: Option<RawValue>,
    #[serde(default)]
    pub localport: Option<RawValue>,
    #[serde(default)]
    pub remotehost: Option<RawValue>,
    #[serde(default)]
    pub remoteport: Option<RawValue>,
    #[serde(default)]
    pub enabled: Option<RawValue>,
}

fn text(value: &Option<RawValue>) -> String {
    value
        .clone()
        .map(RawValue::into_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Secrets are taken verbatim, surrounding whitespace included.
fn secret(value: &Option<RawValue>) -> String {
    value.clone().map(RawValue::into_text).unwrap_or_default()
}

fn parse_port(key: &'static str, value: &str) -> Result<u16, TunnelError> {
    value
        .parse::<u16>()
        .map_err(|_| TunnelError::profile(key, format!("`{}` is not a port number", value)))
}

fn required(key: &'static str, value: String) -> Result<String, TunnelError> {
    if value.is_empty() {
        return Err(TunnelError::profile(key, "value is required"));
    }
    Ok(value)
}

impl RawProfile {
    /// Coerce `enabled` to a boolean.
    pub fn enabled_flag(&self) -> Result<bool, TunnelError> {
        let value = text(&self.enabled);
        if value.is_empty() {
            return Err(TunnelError::profile("enabled", "value is required (0 or 1)"));
        }
        value
            .parse::<i64>()
            .map(|flag| flag != 0)
            .map_err(|_| TunnelError::profile("enabled", format!("`{}` is not 0 or 1", value)))
    }
}

/// A fully coerced connection profile.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub name: String,
    pub enabled: bool,
    pub host: String,
    pub ssh_port: u16,
    pub username: String,
    pub key_file: String,
    pub key_passphrase: String,
    pub password: String,
    pub local_host: String,
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
}

// Secrets stay out of logs.
impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("ssh_port", &self.ssh_port)
            .field("username", &self.username)
            .field("key_file", &self.key_file)
            .field("local", &format_args!("{}:{}", self.local_host, self.local_port))
            .field(
                "remote",
                &format_args!("{}:{}", self.remote_host, self.remote_port),
            )
            .finish()
    }
}

impl ConnectionProfile {
    /// Coerce a raw profile table.
    ///
    /// `keypassphrase` is optional; when it is empty the `password` value doubles
    /// as the key passphrase.
    pub fn from_raw(name: &str, raw: RawProfile) -> Result<Self, TunnelError> {
        let enabled = raw.enabled_flag()?;

        let ssh_port = match text(&raw.sshport) {
            port if port.is_empty() => DEFAULT_SSH_PORT,
            port => parse_port("sshport", &port)?,
        };
        let local_host = match text(&raw.localhost) {
            host if host.is_empty() => DEFAULT_LOCAL_HOST.to_string(),
            host => host,
        };
        let local_port = parse_port("localport", &required("localport", text(&raw.localport))?)?;
        let remote_port =
            parse_port("remoteport", &required("remoteport", text(&raw.remoteport))?)?;

        let password = secret(&raw.password);
        let key_passphrase = match secret(&raw.keypassphrase) {
            passphrase if passphrase.is_empty() => password.clone(),
            passphrase => passphrase,
        };

        Ok(Self {
            name: name.to_string(),
            enabled,
            host: required("host", text(&raw.host))?,
            ssh_port,
            username: text(&raw.username),
            key_file: text(&raw.keyfile),
            key_passphrase,
            password,
            local_host,
            local_port,
            remote_host: required("remotehost", text(&raw.remotehost))?,
            remote_port,
        })
    }

    /// Where and as whom the session connects.
    pub fn session_target(&self) -> SessionTarget {
        SessionTarget {
            host: self.host.clone(),
            port: self.ssh_port,
            username: self.username.clone(),
        }
    }

    /// The local to remote binding carried by the session.
    pub fn forward_binding(&self) -> ForwardBinding {
        ForwardBinding {
            local_host: self.local_host.clone(),
            local_port: self.local_port,
            remote_host: self.remote_host.clone(),
            remote_port: self.remote_port,
        }
    }
}

/// Remote endpoint and identity of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
}

impl fmt::Display for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

/// `(local_host, local_port) -> (remote_host, remote_port)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardBinding {
    pub local_host: String,
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
}

impl ForwardBinding {
    pub fn local(&self) -> String {
        format!("{}:{}", self.local_host, self.local_port)
    }

    pub fn remote(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, RawValue)]) -> RawProfile {
        let mut raw = RawProfile::default();
        for (key, value) in pairs {
            let slot = match *key {
                "keyfile" => &mut raw.keyfile,
                "keypassphrase" => &mut raw.keypassphrase,
                "password" => &mut raw.password,
                "username" => &mut raw.username,
                "host" => &mut raw.host,
                "sshport" => &mut raw.sshport,
                "localhost" => &mut raw.localhost,
                "localport" => &mut raw.localport,
                "remotehost" => &mut raw.remotehost,
                "remoteport" => &mut raw.remoteport,
                "enabled" => &mut raw.enabled,
                other => panic!("unknown key {other}"),
            };
            *slot = Some(value.clone());
        }
        raw
    }

    fn s(value: &str) -> RawValue {
        RawValue::Text(value.to_string())
    }

    fn minimal() -> Vec<(&'static str, RawValue)> {
        vec![
            ("enabled", RawValue::Integer(1)),
            ("host", s("bastion.example.com")),
            ("username", s("deploy")),
            ("localport", RawValue::Integer(15432)),
            ("remotehost", s("10.0.0.5")),
            ("remoteport", RawValue::Integer(5432)),
        ]
    }

    mod coercion {
        use super::*;

        #[test]
        fn test_minimal_profile_uses_defaults() {
            let profile = ConnectionProfile::from_raw("db", raw(&minimal())).unwrap();
            assert_eq!(profile.name, "db");
            assert!(profile.enabled);
            assert_eq!(profile.ssh_port, DEFAULT_SSH_PORT);
            assert_eq!(profile.local_host, DEFAULT_LOCAL_HOST);
            assert_eq!(profile.local_port, 15432);
            assert_eq!(profile.remote_port, 5432);
            assert_eq!(profile.key_file, "");
            assert_eq!(profile.password, "");
        }

        #[test]
        fn test_string_ports_are_parsed() {
            let mut pairs = minimal();
            pairs.push(("sshport", s("2222")));
            pairs.push(("localport", s("8080")));
            let profile = ConnectionProfile::from_raw("web", raw(&pairs)).unwrap();
            assert_eq!(profile.ssh_port, 2222);
            assert_eq!(profile.local_port, 8080);
        }

        #[test]
        fn test_enabled_zero_is_disabled() {
            let mut pairs = minimal();
            pairs.push(("enabled", s("0")));
            let profile = ConnectionProfile::from_raw("db", raw(&pairs)).unwrap();
            assert!(!profile.enabled);
        }

        #[test]
        fn test_enabled_nonzero_is_enabled() {
            let mut pairs = minimal();
            pairs.push(("enabled", RawValue::Integer(7)));
            assert!(ConnectionProfile::from_raw("db", raw(&pairs)).unwrap().enabled);
        }

        #[test]
        fn test_enabled_accepts_toml_boolean() {
            let mut pairs = minimal();
            pairs.push(("enabled", RawValue::Flag(false)));
            assert!(!ConnectionProfile::from_raw("db", raw(&pairs)).unwrap().enabled);
        }

        #[test]
        fn test_passphrase_falls_back_to_password() {
            let mut pairs = minimal();
            pairs.push(("keyfile", s("id_rsa")));
            pairs.push(("password", s("pw")));
            let profile = ConnectionProfile::from_raw("db", raw(&pairs)).unwrap();
            assert_eq!(profile.key_passphrase, "pw");
            assert_eq!(profile.password, "pw");
        }

        #[test]
        fn test_explicit_passphrase_wins() {
            let mut pairs = minimal();
            pairs.push(("password", s("pw")));
            pairs.push(("keypassphrase", s("other")));
            let profile = ConnectionProfile::from_raw("db", raw(&pairs)).unwrap();
            assert_eq!(profile.key_passphrase, "other");
            assert_eq!(profile.password, "pw");
        }
    }

    mod invalid_values {
        use super::*;

        #[test]
        fn test_missing_enabled_is_rejected() {
            let mut raw = raw(&minimal());
            raw.enabled = None;
            let err = ConnectionProfile::from_raw("db", raw).unwrap_err();
            assert!(matches!(err, TunnelError::Profile { key: "enabled", .. }));
        }

        #[test]
        fn test_non_numeric_enabled_is_rejected() {
            let mut pairs = minimal();
            pairs.push(("enabled", s("yes")));
            let err = ConnectionProfile::from_raw("db", raw(&pairs)).unwrap_err();
            assert!(matches!(err, TunnelError::Profile { key: "enabled", .. }));
        }

        #[test]
        fn test_out_of_range_port_is_rejected() {
            let mut pairs = minimal();
            pairs.push(("localport", RawValue::Integer(99999)));
            let err = ConnectionProfile::from_raw("db", raw(&pairs)).unwrap_err();
            assert!(matches!(err, TunnelError::Profile { key: "localport", .. }));
        }

        #[test]
        fn test_negative_port_is_rejected() {
            let mut pairs = minimal();
            pairs.push(("sshport", RawValue::Integer(-22)));
            let err = ConnectionProfile::from_raw("db", raw(&pairs)).unwrap_err();
            assert!(matches!(err, TunnelError::Profile { key: "sshport", .. }));
        }

        #[test]
        fn test_missing_remote_host_is_rejected() {
            let mut raw = raw(&minimal());
            raw.remotehost = None;
            let err = ConnectionProfile::from_raw("db", raw).unwrap_err();
            assert!(matches!(err, TunnelError::Profile { key: "remotehost", .. }));
        }
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut pairs = minimal();
        pairs.push(("password", s("hunter2")));
        let profile = ConnectionProfile::from_raw("db", raw(&pairs)).unwrap();
        let rendered = format!("{:?}", profile);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("bastion.example.com"));
    }

    #[test]
    fn test_target_and_binding() {
        let profile = ConnectionProfile::from_raw("db", raw(&minimal())).unwrap();
        assert_eq!(
            profile.session_target().to_string(),
            "deploy@bastion.example.com:22"
        );
        let binding = profile.forward_binding();
        assert_eq!(binding.local(), "127.0.0.1:15432");
        assert_eq!(binding.remote(), "10.0.0.5:5432");
    }
}
