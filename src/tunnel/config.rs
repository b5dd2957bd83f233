//! Runtime settings for tunnel sessions.
//!
//! Values are resolved with a three-tier priority:
//!
//! 1. **Parameter** - Explicitly provided command line value (highest priority)
//! 2. **Environment Variable** - Value from environment variable
//! 3. **Default** - Built-in default value (lowest priority)
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TINYTUNNEL_CONFIG` | `<exe dir>/connections.toml` | Profile file |
//! | `TINYTUNNEL_CONNECT_TIMEOUT` | 30s | Per-profile connect and auth timeout in seconds |
//! | `TINYTUNNEL_DISCONNECT_TIMEOUT` | 5s | Per-session teardown timeout in seconds |
//! | `TINYTUNNEL_KEEPALIVE` | 30s | Keepalive interval in seconds, 0 disables |
//! | `TINYTUNNEL_COMPRESSION` | false | Offer zlib compression |

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default profile file name, looked up next to the executable
pub const DEFAULT_CONFIG_FILE: &str = "connections.toml";

/// Default connect timeout in seconds
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default disconnect timeout in seconds
pub(crate) const DEFAULT_DISCONNECT_TIMEOUT_SECS: u64 = 5;

/// Default keepalive interval in seconds
pub(crate) const DEFAULT_KEEPALIVE_SECS: u64 = 30;

/// Unanswered keepalives before the session is considered dead
pub(crate) const KEEPALIVE_MAX: usize = 3;

pub(crate) const CONFIG_ENV_VAR: &str = "TINYTUNNEL_CONFIG";
pub(crate) const CONNECT_TIMEOUT_ENV_VAR: &str = "TINYTUNNEL_CONNECT_TIMEOUT";
pub(crate) const DISCONNECT_TIMEOUT_ENV_VAR: &str = "TINYTUNNEL_DISCONNECT_TIMEOUT";
pub(crate) const KEEPALIVE_ENV_VAR: &str = "TINYTUNNEL_KEEPALIVE";
pub(crate) const COMPRESSION_ENV_VAR: &str = "TINYTUNNEL_COMPRESSION";

/// Settings shared by every session of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSettings {
    /// Upper bound on TCP connect plus authentication for one profile
    pub connect_timeout: Duration,
    /// Upper bound on disconnecting one session during shutdown
    pub disconnect_timeout: Duration,
    /// `None` disables keepalive
    pub keepalive: Option<Duration>,
    pub compression: bool,
}

impl TunnelSettings {
    /// Resolve every setting, using `connect_timeout_param` when given.
    pub fn resolve(connect_timeout_param: Option<u64>) -> Self {
        let keepalive = resolve_keepalive_secs();
        Self {
            connect_timeout: Duration::from_secs(resolve_connect_timeout(connect_timeout_param)),
            disconnect_timeout: Duration::from_secs(resolve_disconnect_timeout()),
            keepalive: (keepalive > 0).then(|| Duration::from_secs(keepalive)),
            compression: resolve_compression(),
        }
    }
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            disconnect_timeout: Duration::from_secs(DEFAULT_DISCONNECT_TIMEOUT_SECS),
            keepalive: Some(Duration::from_secs(DEFAULT_KEEPALIVE_SECS)),
            compression: false,
        }
    }
}

/// Resolve the profile file path with priority: parameter -> env var -> `<app_dir>/connections.toml`
pub fn resolve_config_path(path_param: Option<PathBuf>, app_dir: &Path) -> PathBuf {
    if let Some(path) = path_param {
        return path;
    }

    if let Ok(env_path) = env::var(CONFIG_ENV_VAR)
        && !env_path.is_empty()
    {
        return PathBuf::from(env_path);
    }

    app_dir.join(DEFAULT_CONFIG_FILE)
}

/// Resolve the connect timeout with priority: parameter -> env var -> default
///
/// Zero would fail every profile at once, so it is treated as unset.
pub(crate) fn resolve_connect_timeout(timeout_param: Option<u64>) -> u64 {
    if let Some(timeout) = timeout_param.filter(|t| *t > 0) {
        return timeout;
    }

    if let Ok(env_timeout) = env::var(CONNECT_TIMEOUT_ENV_VAR)
        && let Ok(timeout) = env_timeout.parse::<u64>()
        && timeout > 0
    {
        return timeout;
    }

    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Resolve the disconnect timeout with priority: env var -> default. Zero is unset.
pub(crate) fn resolve_disconnect_timeout() -> u64 {
    if let Ok(env_timeout) = env::var(DISCONNECT_TIMEOUT_ENV_VAR)
        && let Ok(timeout) = env_timeout.parse::<u64>()
        && timeout > 0
    {
        return timeout;
    }

    DEFAULT_DISCONNECT_TIMEOUT_SECS
}

/// Resolve the keepalive interval with priority: env var -> default
pub(crate) fn resolve_keepalive_secs() -> u64 {
    if let Ok(env_keepalive) = env::var(KEEPALIVE_ENV_VAR)
        && let Ok(keepalive) = env_keepalive.parse::<u64>()
    {
        return keepalive;
    }

    DEFAULT_KEEPALIVE_SECS
}

/// Resolve the compression setting with priority: env var -> default (false)
pub(crate) fn resolve_compression() -> bool {
    if let Ok(env_compress) = env::var(COMPRESSION_ENV_VAR) {
        return env_compress.eq_ignore_ascii_case("true") || env_compress == "1";
    }

    false
}
